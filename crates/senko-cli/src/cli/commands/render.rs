//! Render command handler: runs the content transform over a file or stdin.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use senko_core::markup;

pub fn run(path: Option<&Path>, plain: bool) -> Result<()> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .lock()
                .read_to_string(&mut raw)
                .context("read stdin")?;
            raw
        }
    };

    let rendered = markup::render(&raw);
    if plain {
        println!("{}", markup::visible_text(&rendered));
    } else {
        println!("{rendered}");
    }
    Ok(())
}
