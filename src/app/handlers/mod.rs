pub mod context_retriever;
pub mod knowledge_retriever;
pub mod long_memory_updater;

use std::fmt;
use std::sync::Arc;

use crate::app::Services;
use crate::domain::ports::{EventPublisher, Handler};
use crate::domain::topology::{
    self, env, FunctionSpec, CONTEXT_RETRIEVER_FUNCTION, KNOWLEDGE_RETRIEVER_FUNCTION,
    MEMORY_UPDATER_FUNCTION,
};
use crate::utils::error::{KnowledgeError, Result};

pub use context_retriever::ContextRetriever;
pub use knowledge_retriever::KnowledgeRetriever;
pub use long_memory_updater::LongMemoryUpdater;

/// The deployable handlers, one per Lambda function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum HandlerKind {
    ContextRetriever,
    KnowledgeRetriever,
    LongMemoryUpdater,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 3] = [
        HandlerKind::ContextRetriever,
        HandlerKind::KnowledgeRetriever,
        HandlerKind::LongMemoryUpdater,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::ContextRetriever => "context_retriever",
            HandlerKind::KnowledgeRetriever => "knowledge_retriever",
            HandlerKind::LongMemoryUpdater => "long_memory_updater",
        }
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            HandlerKind::ContextRetriever => CONTEXT_RETRIEVER_FUNCTION,
            HandlerKind::KnowledgeRetriever => KNOWLEDGE_RETRIEVER_FUNCTION,
            HandlerKind::LongMemoryUpdater => MEMORY_UPDATER_FUNCTION,
        }
    }

    /// The declared function this handler runs as.
    pub fn function_spec(&self) -> Option<FunctionSpec> {
        topology::knowledge_manager_stack()
            .functions
            .into_iter()
            .find(|function| function.name == self.function_name())
    }

    pub fn publishes(&self) -> bool {
        !matches!(self, HandlerKind::LongMemoryUpdater)
    }

    /// Builds the handler from environment configuration.
    ///
    /// Publishing handlers need `publisher`.
    pub fn build(
        &self,
        services: &Services,
        publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Result<Box<dyn Handler>> {
        let publisher = || {
            publisher.clone().ok_or_else(|| KnowledgeError::MissingConfigError {
                field: env::EVENT_BUS_TOPIC_ARN.to_string(),
            })
        };

        let handler: Box<dyn Handler> = match self {
            HandlerKind::ContextRetriever => {
                Box::new(ContextRetriever::from_env(services, publisher()?)?)
            }
            HandlerKind::KnowledgeRetriever => {
                Box::new(KnowledgeRetriever::from_env(services, publisher()?)?)
            }
            HandlerKind::LongMemoryUpdater => Box::new(LongMemoryUpdater::from_env(services)?),
        };
        tracing::debug!(handler = handler.name(), "Handler built");
        Ok(handler)
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_declared() {
        for kind in HandlerKind::ALL {
            let function = kind.function_spec().unwrap();
            assert_eq!(function.binary, kind.name());
            assert_eq!(function.publishes_to.is_some(), kind.publishes());
        }
    }
}
