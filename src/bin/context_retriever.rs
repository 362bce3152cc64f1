use knowledge_manager::config::lambda::run_lambda;
use knowledge_manager::HandlerKind;
use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    run_lambda(HandlerKind::ContextRetriever).await
}
