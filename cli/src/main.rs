// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

#![doc = include_str!("../README.md")]

use std::process::exit;

use anyhow::Result;
use clap::Parser;

mod commands;
mod trust_material;

use commands::{CliArgs, Commands};

async fn run(args: &CliArgs) -> Result<bool> {
    let context = args.context()?;
    match &args.command {
        Commands::Cert(cmd) => cmd.execute(&context).await,
        Commands::Chain(cmd) => cmd.execute(&context).await,
        Commands::Revocation(cmd) => cmd.execute(&context).await,
        Commands::Pa(cmd) => cmd.execute(&context).await,
        Commands::Ingest(cmd) => cmd.execute(&context).await,
    }
}

// Exit status follows grep: 0 valid, 1 invalid, 2 trouble.
#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // RUST_LOG wins over -v
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args).await {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit(2);
        }
    }
}
