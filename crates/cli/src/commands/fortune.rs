//! `haru fortune`: draw a fortune and print its JSON.

use haru_tools::FortuneTool;

pub fn run(period: &str, category: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = FortuneTool::new().draw(period, category);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
