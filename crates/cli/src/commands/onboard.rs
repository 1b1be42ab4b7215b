//! `roundtable onboard` — first-time setup in the current directory.

use roundtable_config::{AppConfig, CONFIG_FILE};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let workdir = std::env::current_dir()?;
    let config_path = workdir.join(CONFIG_FILE);

    println!("roundtable — First-Time Setup");
    println!("=============================\n");

    let config = if config_path.exists() {
        println!("  Config already exists at: {}", config_path.display());
        AppConfig::load_from(&config_path).map_err(|e| format!("Failed to load config: {e}"))?
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created {}", config_path.display());
        AppConfig::default()
    };

    for persona in &config.personas {
        let path = persona.resolve_path(&workdir);
        if path.exists() {
            println!("  Persona {} exists: {}", persona.name, path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, skeleton(&persona.name, &persona.description))?;
        println!("  Created persona {}: {}", persona.name, path.display());
    }

    println!("\nNext steps:");
    println!("  1. Edit the persona files to describe each role");
    println!("  2. Set OPENAI_API_KEY (or AZURE_OPENAI_ENDPOINT + AZURE_OPENAI_API_KEY)");
    println!("  3. Run: roundtable run --prompt \"build a todo list app\"\n");

    Ok(())
}

fn skeleton(name: &str, description: &str) -> String {
    let role = match name {
        "BusinessAnalyst" => {
            "Turn the request into a numbered list of concrete requirements. Ask about anything ambiguous and keep the list up to date as the discussion goes on."
        }
        "SoftwareEngineer" => {
            "Implement the agreed requirements as one complete, self-contained HTML document with inline CSS and JavaScript. Always send the full document inside a single ```html code block."
        }
        "ProductOwner" => {
            "Review each version against every requirement. Point out what is missing. When nothing is missing, say READY FOR USER APPROVAL."
        }
        _ => "Describe how this role contributes to the conversation.",
    };
    format!("You are the {name}. {description}\n\n{role}\n")
}
