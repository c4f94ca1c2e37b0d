//! `haru onboard`: first-time setup.

use haru_config::AppConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_path(config_path);

    println!("☀️  Haru: First-Time Setup");
    println!("==========================\n");

    if write_default(&path)? {
        println!("✅ Created config.toml at: {}", path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set GROQ_API_KEY (or add api_key under [llm])");
        println!("   2. Optionally set OPENWEATHER_API_KEY for live weather");
        println!("   3. Run: haru serve\n");
    } else {
        println!("⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    }

    println!("🎉 Setup complete! Run `haru doctor` to check your setup.\n");
    Ok(())
}

/// Write the default config to `path` unless a file is already there.
/// Returns whether a file was written.
pub fn write_default(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
