use anyhow::{anyhow, Result};
use log::info;
use std::env;
use std::process;
use std::sync::Arc;

use pic18_dasm::config::{parse_address, DisassemblerConfig};
use pic18_dasm::cpu::{InstructionDecoder, OpcodeTable};
use pic18_dasm::listing::Disassembler;
use pic18_dasm::memory::WordOrder;
use pic18_dasm::rom::HexLoader;

const USAGE: &str = "\
PIC 18F Disassembler
Usage:
    pic18-dasm INTEL_HEX_FILE [ADDR_START ADDR_END] [OPTIONS]

Options:
    --config FILE      configuration TOML
    --table FILE       table d'opcodes TOML (table PIC18F de référence par défaut)
    --parallel         décodage parallèle
    --little-endian    mots lus octet de poids faible en tête
    --dump-table       affiche la table d'opcodes active au format TOML

Descriptions:
    Reads in an Intel-formatted hexdump from a PIC 18Fxxxx-family
    microcontroller, and prints assembly code to stdout.
";

/// Arguments de ligne de commande
#[derive(Debug, Default, PartialEq)]
struct Options {
    hex_path: Option<String>,
    range: Option<(u32, u32)>,
    config_path: Option<String>,
    table_path: Option<String>,
    parallel: bool,
    little_endian: bool,
    dump_table: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or_else(|| anyhow!("--config attend un fichier"))?;
                options.config_path = Some(path.clone());
            }
            "--table" => {
                let path = iter.next().ok_or_else(|| anyhow!("--table attend un fichier"))?;
                options.table_path = Some(path.clone());
            }
            "--parallel" => options.parallel = true,
            "--little-endian" => options.little_endian = true,
            "--dump-table" => options.dump_table = true,
            other if other.starts_with("--") => return Err(anyhow!("Option inconnue: {}", other)),
            other => positional.push(other),
        }
    }

    match positional.as_slice() {
        [] => {}
        [path] => options.hex_path = Some(path.to_string()),
        [path, start, end] => {
            options.hex_path = Some(path.to_string());
            options.range = Some((parse_address(start)?, parse_address(end)?));
        }
        _ => return Err(anyhow!("Arguments invalides\n\n{}", USAGE)),
    }

    Ok(options)
}

fn load_table(config: &DisassemblerConfig) -> Result<OpcodeTable> {
    let options = config.decoder.table_options();
    match &config.decoder.table_path {
        Some(path) => {
            info!("Table d'opcodes: {}", path);
            OpcodeTable::from_file(path, options)
        }
        None => Ok(OpcodeTable::pic18()?),
    }
}

fn main() -> Result<()> {
    // Initialiser le logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args[1..])?;

    let mut config = match &options.config_path {
        Some(path) => DisassemblerConfig::load_from_file(path)?,
        None => DisassemblerConfig::default(),
    };
    if let Some((start, end)) = options.range {
        config.range.start = start;
        config.range.end = end;
    }
    if options.table_path.is_some() {
        config.decoder.table_path = options.table_path.clone();
    }
    if options.parallel {
        config.decoder.parallel = true;
    }
    if options.little_endian {
        config.memory.word_order = WordOrder::LittleEndian;
    }

    let table = load_table(&config)?;
    if options.dump_table {
        print!("{}", table.to_toml_string()?);
        return Ok(());
    }

    let hex_path = match options.hex_path {
        Some(path) => path,
        None => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    info!("pic18-dasm v{}", pic18_dasm::VERSION);
    let memory = HexLoader::new()
        .with_padding(config.memory.padding)
        .with_word_order(config.memory.word_order)
        .load_file(&hex_path)?;

    let disassembler = Disassembler::new(InstructionDecoder::new(Arc::new(table)));
    let lines = disassembler.disassemble_memory(
        &memory,
        config.range.start,
        config.range.end,
        config.decoder.parallel,
    )?;

    for line in &lines {
        println!("{}", line.render(&config.output));
    }

    Ok(())
}
