//! featurekit CLI - Apply feature definitions to CSV files
//!
//! ```bash
//! featurekit run input.csv -d features.json    # Apply a feature pipeline
//! featurekit columns -d features.json          # List output columns
//! featurekit parse input.csv                   # Just parse CSV to JSON
//! featurekit types                             # Show recognized data types
//! featurekit example-definition                # Show example pipeline definition
//! ```

use clap::{Parser, Subcommand};
use featurekit::{
    example_definition, parser::parse_file_auto, DataType, FeaturePipeline, Settings,
    TransformOptions,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "featurekit")]
#[command(about = "Apply declarative feature definitions to tabular data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a feature pipeline to a CSV file
    Run {
        /// Input CSV file
        input: PathBuf,

        /// Pipeline definition (JSON)
        #[arg(short, long)]
        definition: PathBuf,

        /// Output file for records (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail instead of overwriting existing columns
        #[arg(long)]
        deny_conflicts: bool,

        /// Keep only the features' output columns
        #[arg(long)]
        only_features: bool,
    },

    /// List the output columns of a pipeline definition
    Columns {
        /// Pipeline definition (JSON)
        #[arg(short, long)]
        definition: PathBuf,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show recognized data types
    Types,

    /// Show an example pipeline definition
    ExampleDefinition,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            definition,
            output,
            deny_conflicts,
            only_features,
        } => cmd_run(&input, &definition, output.as_deref(), deny_conflicts, only_features),

        Commands::Columns { definition } => cmd_columns(&definition),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Types => cmd_types(),

        Commands::ExampleDefinition => cmd_example_definition(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(
    input: &Path,
    definition: &Path,
    output: Option<&Path>,
    deny_conflicts: bool,
    only_features: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let settings = Settings::from_env()?;
    let mut pipeline = FeaturePipeline::from_file(definition)?.with_settings(&settings);
    if deny_conflicts {
        pipeline = pipeline.with_options(TransformOptions::strict());
    }

    eprintln!("   Features: {}", pipeline.features().len());

    let run = pipeline.run_csv(input)?;

    let frame = if only_features {
        let columns = pipeline.output_columns();
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        run.frame.select(&names)?
    } else {
        run.frame
    };

    eprintln!("\n⚙️  Produced {} records with {} columns", frame.num_rows(), frame.columns().len());

    let json = serde_json::to_string_pretty(&frame.to_records())?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_columns(definition: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = FeaturePipeline::from_file(definition)?;

    for feature in pipeline.features() {
        eprintln!("📄 {} - {}", feature.name(), feature.description());
        for column in feature.get_output_columns() {
            println!("{}", column);
        }
    }
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.frame.columns().join(", "));
    eprintln!("✅ Parsed {} records", result.frame.num_rows());

    let json = serde_json::to_string_pretty(&result.frame.to_records())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_types() -> Result<(), Box<dyn std::error::Error>> {
    for dtype in DataType::ALL {
        println!("{:<15} {:?}", dtype.name(), dtype.engine_type());
    }
    Ok(())
}

fn cmd_example_definition() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_definition().to_json()?);
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
