//! Declared cloud resources of the knowledge manager.
//!
//! Tables, functions, topics and subscriptions are described as plain data.
//! Provisioning lives elsewhere; this module only states what exists, how the
//! pieces are wired and which permissions each function needs. The
//! environment variable names the handlers read come from here.

use std::collections::HashSet;

use serde::Serialize;

use crate::utils::error::{KnowledgeError, Result};

/// Environment variables set on the functions.
pub mod env {
    pub const APP_ROLE_TABLE_NAME: &str = "APP_ROLE_TABLE_NAME";
    pub const APP_BEHAVIOUR_TABLE_NAME: &str = "APP_BEHAVIOUR_TABLE_NAME";
    pub const USER_LONG_TERM_MEMORY_TABLE_NAME: &str = "USER_LONG_TERM_MEMORY_TABLE_NAME";
    pub const AI_JOB_SERVICE_URL_SSM_FULL_PATH: &str = "AI_JOB_SERVICE_URL_SSM_FULL_PATH";
    pub const EVENT_BUS_TOPIC_ARN: &str = "EVENT_BUS_TOPIC_ARN";
}

pub const APP_ROLE_TABLE: &str = "AppRoleTable-v1";
pub const APP_BEHAVIOUR_TABLE: &str = "AppBehaviourTable";
pub const USER_LONG_TERM_MEMORY_TABLE: &str = "UserLongTermMemoryTable";

pub const CONTEXT_RETRIEVER_FUNCTION: &str = "ContextRetrieverLambda";
pub const KNOWLEDGE_RETRIEVER_FUNCTION: &str = "KnowledgeRetrieverLambda";
pub const MEMORY_UPDATER_FUNCTION: &str = "UserLongTermMemoryUpdaterLambda";

pub const CONTEXT_TO_BE_RETRIEVED_TOPIC: &str = "KnowledgeManager-ContextToBeRetrieved";
pub const KNOWLEDGE_TO_BE_RETRIEVED_TOPIC: &str = "KnowledgeManager-KnowledgeToBeRetrieved";
pub const MEMORY_TO_BE_UPDATED_TOPIC: &str = "KnowledgeManager-MemoryToBeUpdated";
pub const EVENTS_TOPIC: &str = "KnowledgeManager-Events";

pub const AI_JOB_SERVICE_URL_PARAMETER: &str = "/global/NewAIJobAPIURL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyKind {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySpec {
    pub name: &'static str,
    pub kind: KeyKind,
}

impl KeySpec {
    pub const fn string(name: &'static str) -> Self {
        Self {
            name,
            kind: KeyKind::String,
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: KeyKind::Number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub name: &'static str,
    pub partition_key: KeySpec,
    pub sort_key: Option<KeySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum EnvBinding {
    TableName {
        var: &'static str,
        table: &'static str,
    },
    Parameter {
        var: &'static str,
        path: &'static str,
    },
    EventTopic {
        var: &'static str,
        topic: &'static str,
    },
}

impl EnvBinding {
    pub fn var(&self) -> &'static str {
        match self {
            Self::TableName { var, .. } | Self::Parameter { var, .. } | Self::EventTopic { var, .. } => {
                *var
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    Read,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub table: &'static str,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    /// Cargo binary that implements the function.
    pub binary: &'static str,
    pub environment: Vec<EnvBinding>,
    pub table_grants: Vec<Grant>,
    pub parameter_grants: Vec<&'static str>,
    pub publishes_to: Option<&'static str>,
}

impl FunctionSpec {
    pub fn env_vars(&self) -> Vec<&'static str> {
        self.environment.iter().map(EnvBinding::var).collect()
    }

    pub fn grant_for(&self, table: &str) -> Option<Access> {
        self.table_grants
            .iter()
            .find(|grant| grant.table == table)
            .map(|grant| grant.access)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSpec {
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSpec {
    pub topic: &'static str,
    pub function: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stack {
    pub name: &'static str,
    pub tables: Vec<TableSpec>,
    pub functions: Vec<FunctionSpec>,
    pub topics: Vec<TopicSpec>,
    pub subscriptions: Vec<SubscriptionSpec>,
}

pub fn app_role_table() -> TableSpec {
    TableSpec {
        name: APP_ROLE_TABLE,
        partition_key: KeySpec::string("app_id"),
        sort_key: None,
    }
}

pub fn app_behaviour_table() -> TableSpec {
    TableSpec {
        name: APP_BEHAVIOUR_TABLE,
        partition_key: KeySpec::string("app_id"),
        sort_key: None,
    }
}

pub fn user_long_term_memory_table() -> TableSpec {
    TableSpec {
        name: USER_LONG_TERM_MEMORY_TABLE,
        partition_key: KeySpec::string("user_id"),
        // Unix epoch seconds.
        sort_key: Some(KeySpec::number("timestamp")),
    }
}

pub fn knowledge_manager_stack() -> Stack {
    let context_retriever = FunctionSpec {
        name: CONTEXT_RETRIEVER_FUNCTION,
        binary: "context_retriever",
        environment: vec![
            EnvBinding::TableName {
                var: env::APP_BEHAVIOUR_TABLE_NAME,
                table: APP_BEHAVIOUR_TABLE,
            },
            EnvBinding::TableName {
                var: env::USER_LONG_TERM_MEMORY_TABLE_NAME,
                table: USER_LONG_TERM_MEMORY_TABLE,
            },
            EnvBinding::EventTopic {
                var: env::EVENT_BUS_TOPIC_ARN,
                topic: EVENTS_TOPIC,
            },
        ],
        table_grants: vec![
            Grant {
                table: APP_BEHAVIOUR_TABLE,
                access: Access::ReadWrite,
            },
            Grant {
                table: USER_LONG_TERM_MEMORY_TABLE,
                access: Access::Read,
            },
        ],
        parameter_grants: vec![],
        publishes_to: Some(EVENTS_TOPIC),
    };

    let knowledge_retriever = FunctionSpec {
        name: KNOWLEDGE_RETRIEVER_FUNCTION,
        binary: "knowledge_retriever",
        environment: vec![
            EnvBinding::TableName {
                var: env::APP_ROLE_TABLE_NAME,
                table: APP_ROLE_TABLE,
            },
            EnvBinding::EventTopic {
                var: env::EVENT_BUS_TOPIC_ARN,
                topic: EVENTS_TOPIC,
            },
        ],
        table_grants: vec![Grant {
            table: APP_ROLE_TABLE,
            access: Access::ReadWrite,
        }],
        parameter_grants: vec![],
        publishes_to: Some(EVENTS_TOPIC),
    };

    let memory_updater = FunctionSpec {
        name: MEMORY_UPDATER_FUNCTION,
        binary: "long_memory_updater",
        environment: vec![
            EnvBinding::TableName {
                var: env::USER_LONG_TERM_MEMORY_TABLE_NAME,
                table: USER_LONG_TERM_MEMORY_TABLE,
            },
            EnvBinding::Parameter {
                var: env::AI_JOB_SERVICE_URL_SSM_FULL_PATH,
                path: AI_JOB_SERVICE_URL_PARAMETER,
            },
        ],
        table_grants: vec![Grant {
            table: USER_LONG_TERM_MEMORY_TABLE,
            access: Access::ReadWrite,
        }],
        parameter_grants: vec![AI_JOB_SERVICE_URL_PARAMETER],
        publishes_to: None,
    };

    Stack {
        name: "KnowledgeManagerStack",
        tables: vec![
            app_role_table(),
            app_behaviour_table(),
            user_long_term_memory_table(),
        ],
        functions: vec![context_retriever, knowledge_retriever, memory_updater],
        topics: vec![
            TopicSpec {
                name: CONTEXT_TO_BE_RETRIEVED_TOPIC,
            },
            TopicSpec {
                name: KNOWLEDGE_TO_BE_RETRIEVED_TOPIC,
            },
            TopicSpec {
                name: MEMORY_TO_BE_UPDATED_TOPIC,
            },
            TopicSpec { name: EVENTS_TOPIC },
        ],
        subscriptions: vec![
            SubscriptionSpec {
                topic: CONTEXT_TO_BE_RETRIEVED_TOPIC,
                function: CONTEXT_RETRIEVER_FUNCTION,
            },
            SubscriptionSpec {
                topic: KNOWLEDGE_TO_BE_RETRIEVED_TOPIC,
                function: KNOWLEDGE_RETRIEVER_FUNCTION,
            },
            SubscriptionSpec {
                topic: MEMORY_TO_BE_UPDATED_TOPIC,
                function: MEMORY_UPDATER_FUNCTION,
            },
        ],
    }
}

impl Stack {
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn topic(&self, name: &str) -> Option<&TopicSpec> {
        self.topics.iter().find(|topic| topic.name == name)
    }

    /// Functions triggered by a topic.
    pub fn subscribers(&self, topic: &str) -> Vec<&FunctionSpec> {
        self.subscriptions
            .iter()
            .filter(|sub| sub.topic == topic)
            .filter_map(|sub| self.function(sub.function))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        unique("tables", self.tables.iter().map(|t| t.name))?;
        unique("functions", self.functions.iter().map(|f| f.name))?;
        unique("topics", self.topics.iter().map(|t| t.name))?;

        for function in &self.functions {
            let field = format!("functions.{}", function.name);
            unique(&format!("{}.environment", field), function.env_vars().into_iter())?;

            for grant in &function.table_grants {
                if self.table(grant.table).is_none() {
                    return Err(invalid(&field, grant.table, "grant references an unknown table"));
                }
            }

            for binding in &function.environment {
                match binding {
                    EnvBinding::TableName { table, .. } => {
                        if self.table(table).is_none() {
                            return Err(invalid(&field, table, "environment references an unknown table"));
                        }
                        if function.grant_for(table).is_none() {
                            return Err(invalid(&field, table, "table is bound without a grant"));
                        }
                    }
                    EnvBinding::Parameter { path, .. } => {
                        if !function.parameter_grants.contains(path) {
                            return Err(invalid(&field, path, "parameter is bound without a grant"));
                        }
                    }
                    EnvBinding::EventTopic { topic, .. } => {
                        if self.topic(topic).is_none() {
                            return Err(invalid(&field, topic, "environment references an unknown topic"));
                        }
                    }
                }
            }

            if let Some(topic) = function.publishes_to {
                if self.topic(topic).is_none() {
                    return Err(invalid(&field, topic, "publishes to an unknown topic"));
                }
            }
        }

        for subscription in &self.subscriptions {
            if self.topic(subscription.topic).is_none() {
                return Err(invalid("subscriptions", subscription.topic, "unknown topic"));
            }
            if self.function(subscription.function).is_none() {
                return Err(invalid("subscriptions", subscription.function, "unknown function"));
            }
        }

        Ok(())
    }
}

fn unique<'a>(field: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(invalid(field, name, "duplicate name"));
        }
    }
    Ok(())
}

fn invalid(field: &str, value: &str, reason: &str) -> KnowledgeError {
    KnowledgeError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
