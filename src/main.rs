use std::io::{self, stdout, BufRead, Write};
use std::panic;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;

use solana_ledger_signer::{
    ledger, path, ConfirmOptions, HttpRpc, LedgerTransport, SolanaApp,
};

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SignAndSendArgs {
    /// JSON-RPC endpoint of the Solana node.
    pub rpc_url: String,
    /// Base64-encoded serialized (unsigned) transaction.
    pub transaction: String,
    /// Base58 public key whose signature slot the device signature fills.
    pub signer: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Key {
    pub public_key: String,
    pub key_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct KeysResponse {
    pub keys: Vec<Key>,
}

#[tokio::main]
pub async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    set_panic_hook();
    let buf_reader = io::BufReader::new(io::stdin());
    match run_cli(buf_reader).await {
        Ok(result) => println!("{}", serde_json::to_string(&result).unwrap()),
        Err(e) => {
            return_error(&e.to_string());
        }
    }
}

pub fn set_panic_hook() {
    panic::set_hook(Box::new(move |info| {
        let payload = if let Some(payload) = info.payload().downcast_ref::<String>().or(info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .as_ref())
        {
            payload.clone()
        } else {
            "unknown panic".to_string()
        };

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        let json = json!({
            "error": {
                "code": 1,
                "message": "Panic occurred",
                "data": {
                    "payload": payload,
                    "location": location,
                }
            },
        });

        let _ = writeln!(stdout(), "{json}");
    }));
}

pub async fn run_cli<R: BufRead>(buf_reader: R) -> Result<Value, anyhow::Error> {
    if std::env::args().nth(1).as_deref() != Some("call") {
        eprintln!("This script is meant to be called with 'call' as the first argument");
        std::process::exit(1);
    }

    let JsonRpcRequest {
        jsonrpc: _,
        method,
        params,
        id: _,
    } = read_json_line(buf_reader)?;

    if method.is_empty() {
        return Err(anyhow!("Method is required"));
    }

    match method.as_str() {
        "pubkey" => {
            let transport = LedgerTransport::open().await?;
            let mut app = SolanaApp::new(transport);
            let mut keys = vec![];
            for account in 0..5 {
                let derivation_path = path::derivation_path(Some(account), None);
                let pubkey = app.get_pubkey(&derivation_path).await?;
                keys.push(Key {
                    public_key: bs58::encode(&pubkey).into_string(),
                    key_id: format!("44'/501'/{account}'"),
                });
            }
            Ok(serde_json::to_value(KeysResponse { keys })?)
        }
        "sign_and_send" => {
            let args = serde_json::from_value::<SignAndSendArgs>(params)
                .map_err(|e| anyhow!("Failed to parse sign_and_send arguments: {e}"))?;

            let signer = Pubkey::from_str(&args.signer)
                .map_err(|e| anyhow!("Invalid signer public key: {e}"))?;
            let tx_bytes = general_purpose::STANDARD
                .decode(&args.transaction)
                .map_err(|e| anyhow!("Invalid base64 transaction: {e}"))?;
            let mut tx: Transaction = bincode::deserialize(&tx_bytes)
                .map_err(|e| anyhow!("Failed to decode transaction: {e}"))?;

            let defaults = ConfirmOptions::default();
            let options = ConfirmOptions {
                timeout: args.timeout_ms.map_or(defaults.timeout, Duration::from_millis),
                delay: args.delay_ms.map_or(defaults.delay, Duration::from_millis),
            };

            let transport = LedgerTransport::open().await?;
            let mut app = SolanaApp::new(transport);
            let rpc = HttpRpc::new(&args.rpc_url);

            let result = ledger::send_and_confirm(&mut app, &rpc, &mut tx, &signer, &options).await?;
            Ok(serde_json::to_value(result)?)
        }
        _ => Err(anyhow!("Invalid method: {}", method)),
    }
}

fn return_error(message: &str) {
    println!(
        "{}",
        json!({
            "error": {
                "code": 1,
                "message": message,
            },
        })
    );
}

pub fn read_json_line<R: BufRead>(mut buf_reader: R) -> Result<JsonRpcRequest, anyhow::Error> {
    let mut input = String::new();
    buf_reader.read_line(&mut input)?;
    Ok(serde_json::from_str(&input)?)
}
