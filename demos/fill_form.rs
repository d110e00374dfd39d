//! Fill a PDF form from the command line
//! Run with: cargo run --example fill_form -- input.pdf [name=value ...] [-o output.pdf]
//!
//! Without `name=value` pairs the form's fields are listed.

use anyhow::{bail, Context};
use form_session::{LoadOutcome, SelectedFile, Session, SessionConfig};
use std::fs;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "form_session=info,pdf_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        bail!("usage: fill_form <input.pdf> [name=value ...] [-o output.pdf]");
    };

    let mut edits = Vec::new();
    let mut output = None;
    while let Some(arg) = args.next() {
        if arg == "-o" {
            output = Some(args.next().context("-o needs a filename")?);
        } else if let Some((name, value)) = arg.split_once('=') {
            edits.push((name.to_string(), value.to_string()));
        } else {
            bail!("expected name=value, got {arg:?}");
        }
    }

    let bytes = fs::read(&input).with_context(|| format!("reading {input}"))?;
    let name = Path::new(&input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.clone());

    let mut session = Session::new(SessionConfig::default());
    match session.load(SelectedFile::new(name, pdf_core::PDF_MEDIA_TYPE, bytes))? {
        LoadOutcome::Ready {
            page_count,
            field_count,
        } => println!("{input}: {page_count} pages, {field_count} fields"),
        other => bail!("document not loaded: {other:?}"),
    }

    if edits.is_empty() {
        for field in session.field_views() {
            let flag = if field.read_only { " (read-only)" } else { "" };
            println!(
                "  {:<30} {:<9} p{:?} = {:?}{flag}",
                field.name,
                format!("{:?}", field.kind),
                field.pages,
                field.value,
            );
        }
        return Ok(());
    }

    for (name, value) in &edits {
        session.set_field(name, value)?;
    }

    let exported = session.export(output.as_deref())?;
    // The exported name is already sanitized; keep the requested directory
    let target = Path::new(output.as_deref().unwrap_or(&input)).with_file_name(&exported.filename);
    fs::write(&target, &exported.bytes).with_context(|| format!("writing {}", target.display()))?;
    println!(
        "Wrote {} ({} bytes, {} fields changed)",
        target.display(),
        exported.bytes.len(),
        exported.applied.len()
    );

    Ok(())
}
