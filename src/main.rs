#[actix_web::main]
async fn main() -> std::io::Result<()> {
    datafabric_lib::run().await
}
