use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use clap::Subcommand;
use lnurl_client::{
    LnurlAuthParams, LnurlClient, LnurlResponse, PayerDataValues, Validated, decode,
    decode_strict, encode, encode_strict, find_in_text, random_k1, verify_signature,
};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::Serialize;
use tracing::info;

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Decode a bech32 LNURL or a LUD-17 URL into the URL to query
    Decode {
        lnurl: String,

        /// Apply the scheme and domain policy
        #[arg(long)]
        strict: bool,
    },

    /// Encode a URL as a bech32 LNURL
    Encode {
        url: String,

        /// Apply the scheme and domain policy before encoding
        #[arg(long)]
        strict: bool,
    },

    /// Print the first LNURL found in a piece of text
    Find { text: String },

    /// Resolve an LNURL, lightning address or URL and print its parameters
    Handle { input: String },

    /// Request an invoice from an LNURL-pay service and verify it
    Pay {
        input: String,

        /// Amount to pay in millisatoshi
        #[arg(short, long)]
        amount_msat: u64,

        /// Comment sent along with the payment, if the service allows one
        #[arg(short, long)]
        comment: Option<String>,

        /// Payer name (LUD-18)
        #[arg(long)]
        name: Option<String>,

        /// Payer public key (LUD-18)
        #[arg(long)]
        pubkey: Option<String>,

        /// Payer lightning address (LUD-18)
        #[arg(long)]
        identifier: Option<String>,

        /// Payer email (LUD-18)
        #[arg(long)]
        email: Option<String>,
    },

    /// Hand an invoice to an LNURL-withdraw service
    Withdraw {
        input: String,

        /// BOLT11 invoice the service should pay
        #[arg(short, long)]
        invoice: String,
    },

    /// Sign an LNURL-auth challenge with the given key and submit it
    Auth {
        input: String,

        /// Hex encoded secret key used to sign the challenge
        #[arg(long)]
        secret_key: String,
    },

    /// Verify an LNURL-auth signature
    Verify {
        /// Hex encoded challenge
        k1: String,
        /// Hex encoded DER signature
        sig: String,
        /// Hex encoded compressed public key
        key: String,
    },

    /// Generate a random LNURL-auth challenge
    K1,
}

pub(crate) async fn execute_command(command: Command, client: &LnurlClient) -> Result<()> {
    match command {
        Command::Decode { lnurl, strict } => {
            if strict || client.config().strict {
                print_validated(decode_strict(&lnurl)?);
            } else {
                println!("{}", decode(&lnurl)?);
            }
        }
        Command::Encode { url, strict } => {
            if strict || client.config().strict {
                print_validated(encode_strict(&url)?);
            } else {
                println!("{}", encode(&url)?);
            }
        }
        Command::Find { text } => {
            let found = find_in_text(&text).ok_or_else(|| anyhow!("No LNURL found"))?;
            println!("{found}");
        }
        Command::Handle { input } => {
            let response = client.handle(&input).await?;
            print_value(&response)?;
        }
        Command::Pay {
            input,
            amount_msat,
            comment,
            name,
            pubkey,
            identifier,
            email,
        } => {
            let LnurlResponse::Pay(params) = client.handle(&input).await? else {
                bail!("Not an LNURL-pay endpoint: {input}");
            };
            let payer_data = payer_data(name, pubkey, identifier, email);
            let result = client
                .pay(&params, amount_msat, comment.as_deref(), payer_data.as_ref())
                .await?;
            print_value(&result)?;
        }
        Command::Withdraw { input, invoice } => {
            let LnurlResponse::Withdraw(params) = client.handle(&input).await? else {
                bail!("Not an LNURL-withdraw endpoint: {input}");
            };
            client.withdraw(&params, &invoice).await?;
            info!("Withdraw request accepted by {}", params.callback);
            println!("OK");
        }
        Command::Auth { input, secret_key } => {
            let LnurlResponse::Auth(params) = client.handle(&input).await? else {
                bail!("Not an LNURL-auth endpoint: {input}");
            };
            let (sig, key) = sign_challenge(&params, &secret_key)?;
            client.submit_auth(&params, &sig, &key).await?;
            info!("Authenticated with {}", params.host);
            println!("OK");
        }
        Command::Verify { k1, sig, key } => {
            println!("{}", verify_signature(&k1, &sig, &key)?);
        }
        Command::K1 => println!("{}", random_k1()),
    }
    Ok(())
}

fn print_value<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_validated(validated: Validated<String>) {
    if let Some(warning) = validated.warning {
        eprintln!("warning: {warning}");
    }
    println!("{}", validated.value);
}

/// Payer data is only sent when at least one value was given.
fn payer_data(
    name: Option<String>,
    pubkey: Option<String>,
    identifier: Option<String>,
    email: Option<String>,
) -> Option<PayerDataValues> {
    if name.is_none() && pubkey.is_none() && identifier.is_none() && email.is_none() {
        return None;
    }
    Some(PayerDataValues {
        name: name.unwrap_or_default(),
        pubkey: pubkey.unwrap_or_default(),
        identifier: identifier.unwrap_or_default(),
        email: email.unwrap_or_default(),
        auth: None,
    })
}

/// Returns the hex encoded DER signature of `k1` and the compressed public key.
fn sign_challenge(params: &LnurlAuthParams, secret_key: &str) -> Result<(String, String)> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_str(secret_key)?;
    let message = Message::from_digest_slice(&hex::decode(&params.k1)?)?;
    let sig = secp.sign_ecdsa(&message, &secret_key);
    let key = PublicKey::from_secret_key(&secp, &secret_key);
    Ok((hex::encode(sig.serialize_der()), key.to_string()))
}
