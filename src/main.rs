#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    corso_docs::run().await
}
