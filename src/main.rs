use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let mut output = String::new();
    let result = mython::run_program(&source, &mut output);
    // Whatever the program printed before a failure is still its output.
    if !output.is_empty() {
        print!("{output}");
    }
    result?;
    Ok(())
}
