//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Render the resolved config as the TOML it would be saved as.
fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show: file + env + flags ────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config()?;
            config::apply_overrides(&mut cfg, global);
            let out = output::render_single(global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Init: write defaults ────────────────────────────────────
        ConfigCommand::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!(
                        "file already exists at {}; pass --force to overwrite",
                        path.display()
                    ),
                });
            }

            let mut cfg = Config::default();
            config::apply_overrides(&mut cfg, global);
            // Validate before writing anything.
            cfg.to_agent_config()?;
            let written = config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("✓ Configuration written to {}", written.display());
                eprintln!("  Test it: boardlink info");
            }
            Ok(())
        }
    }
}
