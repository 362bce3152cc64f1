use std::time::Instant;

use serde_json::Value;

use crate::core::event::extract_bodies;
use crate::domain::ports::Handler;
use crate::utils::error::Result;

/// Runs a handler over every body carried by a trigger event.
pub struct HandlerEngine<H: Handler> {
    handler: H,
}

impl<H: Handler> HandlerEngine<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// One body returns the handler's output as is; several return an
    /// array of outputs in record order. The first failure stops the run.
    pub async fn run(&self, event: Value) -> Result<Value> {
        let bodies = extract_bodies(event)?;
        let name = self.handler.name();
        tracing::info!(handler = name, bodies = bodies.len(), "Starting handler");

        let mut outputs = Vec::with_capacity(bodies.len());
        for body in bodies {
            let started = Instant::now();
            match self.handler.handle(body).await {
                Ok(output) => {
                    tracing::info!(
                        handler = name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Handler completed"
                    );
                    outputs.push(output);
                }
                Err(e) => {
                    tracing::error!(
                        handler = name,
                        error = %e,
                        severity = ?e.severity(),
                        retryable = e.is_retryable(),
                        "Handler failed"
                    );
                    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                    return Err(e);
                }
            }
        }

        Ok(if outputs.len() == 1 {
            outputs.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(outputs)
        })
    }

    #[cfg(feature = "lambda")]
    pub async fn handle_event(
        &self,
        event: lambda_runtime::LambdaEvent<Value>,
    ) -> std::result::Result<Value, lambda_runtime::Error> {
        use tracing::Instrument;

        let span = tracing::info_span!("invocation", request_id = %event.context.request_id);
        Ok(self.run(event.payload).instrument(span).await?)
    }
}
