use anyhow::{Context, Result};
use formgen::services::loader;
use formgen::FormGenerator;
use formgen::MetadataProvider;

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let arg = std::env::args().nth(1);
    let path = loader::resolve_config_path(arg.as_deref())?;
    let cfg = loader::load_config(&path)?;
    let registry = loader::build_registry(&cfg);
    let target = loader::build_target(&cfg, &registry)?;

    let metadata: Option<&dyn MetadataProvider> = if cfg.orm { Some(&registry) } else { None };
    let mut form = FormGenerator::new(&registry, metadata).with_escaping(cfg.escaping);
    if let Some(label) = &cfg.submit_label {
        form = form.with_submit_label(label.clone());
    }
    form.generate(
        target,
        &cfg.action,
        loader::field_options(&cfg),
        cfg.form.clone(),
    )
    .with_context(|| format!("generating form from {path:?}"))?;
    form.show().with_context(|| "writing form markup")?;
    println!();
    Ok(())
}
