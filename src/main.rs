// Copyright 2025 The Karmada Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, Subcommand};
use dashboard::config::ServeArgs;
use dashboard::{BuildInfo, run};

#[derive(Parser)]
#[command(name = "karmada-dashboard")]
#[command(about = "Karmada multi-cluster dashboard API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard API server
    Serve(ServeArgs),

    /// Print version and build information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => run(args).await?,
        Commands::Version => {
            let build = BuildInfo::current();
            println!("karmada-dashboard {}", build.version);
            println!("commit:     {} ({})", build.commit, build.branch);
            println!("build time: {}", build.build_time);
            println!("rustc:      {}", build.rust_version);
        }
    }

    Ok(())
}
