use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use vitalis::api::types::{Frequency, PredictRequest, QuickPredictRequest, Transport, YesNo};
use vitalis::{cli, config, logging};

#[derive(Debug, Parser)]
#[command(name = "vitalis")]
#[command(about = "Terminal client for the obesity-risk prediction service and health assistant")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

/// The four fields every prediction needs.
#[derive(Debug, Args)]
struct BasicInput {
    /// Gender as the model expects it (`Male` or `Female`)
    #[arg(long)]
    gender: String,
    /// Age in years
    #[arg(long)]
    age: u32,
    /// Height in centimetres
    #[arg(long)]
    height: u32,
    /// Weight in kilograms
    #[arg(long)]
    weight: f64,
}

impl BasicInput {
    fn into_request(self) -> QuickPredictRequest {
        QuickPredictRequest {
            gender: self.gender,
            age: self.age,
            height: self.height,
            weight: self.weight,
        }
    }
}

/// Lifestyle features for the detailed prediction. Defaults match the
/// values the service assumes for a quick prediction.
#[derive(Debug, Args)]
struct LifestyleInput {
    /// Family history of overweight
    #[arg(long, value_enum, default_value = "no")]
    family_history: YesNo,
    /// Frequent high-calorie food
    #[arg(long, value_enum, default_value = "no")]
    favc: YesNo,
    /// Vegetable consumption (1-3)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=3))]
    fcvc: u8,
    /// Main meals per day (1-4)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=4))]
    ncp: u8,
    /// Eating between meals
    #[arg(long, value_enum, default_value = "sometimes")]
    caec: Frequency,
    /// Smoker
    #[arg(long, value_enum, default_value = "no")]
    smoke: YesNo,
    /// Daily water intake (1-3)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=3))]
    ch2o: u8,
    /// Monitors calorie intake
    #[arg(long, value_enum, default_value = "no")]
    scc: YesNo,
    /// Physical activity frequency (0-3)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=3))]
    faf: u8,
    /// Time using devices (0-2)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
    tue: u8,
    /// Alcohol consumption
    #[arg(long, value_enum, default_value = "sometimes")]
    calc: Frequency,
    /// Usual transportation
    #[arg(long, value_enum, default_value = "automobile")]
    mtrans: Transport,
}

fn full_request(basic: BasicInput, life: LifestyleInput) -> PredictRequest {
    PredictRequest {
        gender: basic.gender,
        age: basic.age,
        height: basic.height,
        weight: basic.weight,
        family_history: life.family_history,
        favc: life.favc,
        fcvc: life.fcvc,
        ncp: life.ncp,
        caec: life.caec,
        smoke: life.smoke,
        ch2o: life.ch2o,
        scc: life.scc,
        faf: life.faf,
        tue: life.tue,
        calc: life.calc,
        mtrans: life.mtrans,
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check the prediction API, the assistant, and local state
    Health,
    /// Quick prediction from gender, age, height and weight
    Quick {
        #[command(flatten)]
        basic: BasicInput,
        /// Print the result as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Detailed prediction including lifestyle features
    Predict {
        #[command(flatten)]
        basic: BasicInput,
        #[command(flatten)]
        lifestyle: LifestyleInput,
        /// Print the result as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Health recommendations for the last prediction
    Recommend {
        /// Print the recommendations as HTML
        #[arg(long)]
        html: bool,
    },
    /// Print a chat link carrying the last prediction
    Handoff,
    /// Talk to the health assistant
    Chat {
        /// Hand-off link or encoded `data` value to load as health data
        #[arg(long, conflicts_with = "from_last")]
        data: Option<String>,
        /// Load the last prediction as health data
        #[arg(long)]
        from_last: bool,
    },
    /// Check whether the assistant is available
    Status,
    /// Print the stored chat history
    History {
        /// Print the chat page's message list as HTML
        #[arg(long)]
        html: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.vitalis/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `vitalis config set api.base_url http://host:5000`
    Set { key: String, value: String },
    /// Reset ~/.vitalis/config.toml to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let cfg = config::load();
    logging::init(&cfg.logging);

    match app.command {
        Commands::Health => cli::run_health(&cfg),
        Commands::Quick { basic, html } => cli::run_quick(&cfg, &basic.into_request(), html),
        Commands::Predict {
            basic,
            lifestyle,
            html,
        } => cli::run_predict(&cfg, &full_request(basic, lifestyle), html),
        Commands::Recommend { html } => cli::run_recommend(&cfg, html),
        Commands::Handoff => cli::run_handoff(&cfg),
        Commands::Chat { data, from_last } => cli::run_chat(&cfg, data.as_deref(), from_last),
        Commands::Status => cli::run_status(&cfg),
        Commands::History { html } => cli::run_history(&cfg, html),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
