//! [`StackProvider`] backed by the AWS CloudFormation SDK.

use async_trait::async_trait;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{self, Capability, Parameter};
use aws_sdk_cloudformation::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    ProviderError, StackDescription, StackEventPage, StackProvider, StackRequest,
    StackSummaryPage, UNHANDLED_ERROR_CODE,
};
use crate::core::{StackEvent, StackOutput, StackStatus};

/// CloudFormation client wrapper.
#[derive(Debug, Clone)]
pub struct CloudFormationProvider {
    client: Client,
}

impl CloudFormationProvider {
    /// Wraps an existing SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the standard AWS configuration chain, optionally
    /// pinning the region and named profile.
    pub async fn from_env(region: Option<String>, profile: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_sdk_cloudformation::config::Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        debug!(region = ?sdk_config.region(), "Loaded AWS configuration");
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl StackProvider for CloudFormationProvider {
    async fn list_stacks(
        &self,
        status_filter: &[StackStatus],
        next_token: Option<String>,
    ) -> Result<StackSummaryPage, ProviderError> {
        let filter = status_filter
            .iter()
            .map(|s| types::StackStatus::from(s.as_str()))
            .collect();

        let output = self
            .client
            .list_stacks()
            .set_stack_status_filter(Some(filter))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(provider_error)?;

        let stack_names = field(output.stack_summaries())
            .unwrap_or_default()
            .iter()
            .filter_map(|summary| field(summary.stack_name()).map(str::to_string))
            .collect();

        Ok(StackSummaryPage {
            stack_names,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn describe_stack(&self, stack_name: &str) -> Result<StackDescription, ProviderError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(provider_error)?;

        let stack = field(output.stacks())
            .and_then(<[types::Stack]>::first)
            .ok_or_else(|| ProviderError::stack_missing(stack_name))?;

        let outputs = field(stack.outputs())
            .unwrap_or_default()
            .iter()
            .filter_map(|o| Some(StackOutput::new(o.output_key()?, o.output_value()?)))
            .collect();

        Ok(StackDescription {
            name: field(stack.stack_name()).unwrap_or(stack_name).to_string(),
            status: field(stack.stack_status())
                .map_or_else(|| StackStatus::Unknown(String::new()), |s| s.as_str().into()),
            outputs,
        })
    }

    async fn describe_stack_events(
        &self,
        stack_name: &str,
        next_token: Option<String>,
    ) -> Result<StackEventPage, ProviderError> {
        let output = self
            .client
            .describe_stack_events()
            .stack_name(stack_name)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(provider_error)?;

        let events = field(output.stack_events())
            .unwrap_or_default()
            .iter()
            .map(|event| convert_event(event, stack_name))
            .collect();

        Ok(StackEventPage {
            events,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<(), ProviderError> {
        self.client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(sdk_parameters(request)))
            .set_capabilities(Some(sdk_capabilities(request)))
            .disable_rollback(request.disable_rollback)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<(), ProviderError> {
        self.client
            .update_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(sdk_parameters(request)))
            .set_capabilities(Some(sdk_capabilities(request)))
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<(), ProviderError> {
        self.client
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }
}

/// SDK accessors return `&T` for required members and `Option<&T>` for
/// optional ones; this normalizes both.
fn field<'a, T: ?Sized + 'a>(value: impl Into<Option<&'a T>>) -> Option<&'a T> {
    value.into()
}

fn provider_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or(UNHANDLED_ERROR_CODE).to_string();
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_string);
    ProviderError::new(code, message)
}

fn sdk_parameters(request: &StackRequest) -> Vec<Parameter> {
    request
        .parameters
        .iter()
        .map(|p| {
            Parameter::builder()
                .parameter_key(&p.key)
                .parameter_value(&p.value)
                .build()
        })
        .collect()
}

fn sdk_capabilities(request: &StackRequest) -> Vec<Capability> {
    request
        .capabilities
        .iter()
        .map(|c| Capability::from(c.as_str()))
        .collect()
}

fn convert_event(event: &types::StackEvent, stack_name: &str) -> StackEvent {
    StackEvent {
        event_id: field(event.event_id()).unwrap_or_default().to_string(),
        stack_name: field(event.stack_name()).unwrap_or(stack_name).to_string(),
        logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
        physical_resource_id: event.physical_resource_id().map(str::to_string),
        resource_type: event.resource_type().unwrap_or_default().to_string(),
        resource_status: event
            .resource_status()
            .map_or_else(|| StackStatus::Unknown(String::new()), |s| s.as_str().into()),
        status_reason: event.resource_status_reason().map(str::to_string),
        timestamp: field(event.timestamp())
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())),
    }
}
