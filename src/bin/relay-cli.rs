use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator CLI for the bounty relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3001")]
    url: String,

    /// Admin API key.
    #[arg(short, long, env = "RELAY_ADMIN_API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Node reachability and backend wallet
    Health,
    /// Faucet amount, swap rate, and pool balance
    Info,
    /// Backend wallet, pool, and network status (admin)
    Status,
    /// Set the swap rate in tokens per wei (admin)
    SetRate { rate: u64 },
    /// Set the faucet grant in whole tokens, e.g. "100" (admin)
    SetFaucetAmount { amount: String },
    /// Transfer backend tokens into the swap pool (admin)
    Fund { amount: String },
    /// Withdraw tokens from the swap pool (admin)
    WithdrawToken { amount: String },
    /// Withdraw the pool's native balance (admin)
    WithdrawEth,
    /// Accept an answer and record the reward for an account (admin)
    AcceptAnswer {
        account_id: u64,
        question_id: u64,
        answer_id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let admin = |path: &str| format!("{}/faucet-swap/admin/{}", cli.url, path);

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Info => client.get(format!("{}/faucet-swap/info", cli.url)).send().await?,
        Commands::Status => client.get(admin("status")).headers(headers).send().await?,
        Commands::SetRate { rate } => {
            client
                .post(admin("set-rate"))
                .headers(headers)
                .json(&json!({ "rate": rate }))
                .send()
                .await?
        }
        Commands::SetFaucetAmount { amount } => {
            client
                .post(admin("set-faucet-amount"))
                .headers(headers)
                .json(&json!({ "amount": amount }))
                .send()
                .await?
        }
        Commands::Fund { amount } => {
            client
                .post(admin("fund"))
                .headers(headers)
                .json(&json!({ "amount": amount }))
                .send()
                .await?
        }
        Commands::WithdrawToken { amount } => {
            client
                .post(admin("withdraw-token"))
                .headers(headers)
                .json(&json!({ "amount": amount }))
                .send()
                .await?
        }
        Commands::WithdrawEth => client.post(admin("withdraw-eth")).headers(headers).send().await?,
        Commands::AcceptAnswer {
            account_id,
            question_id,
            answer_id,
        } => {
            client
                .post(admin("accept-answer"))
                .headers(headers)
                .json(&json!({
                    "accountId": account_id,
                    "questionId": question_id,
                    "answerId": answer_id,
                }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
