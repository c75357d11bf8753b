use super::open_service;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service()?;
    println!("{}", serde_json::to_string_pretty(&service.registry().names())?);
    Ok(())
}
