//! dialtone-app — interactive login + inbox + dial demo.
//!
//! Run with `cargo run -p dialtone-app`, then:
//!   v            list voicemails
//!   t            list texts
//!   c <number>   call a number (rings your callback number first)
//!   s <number> <text…>   send an SMS
//!   q            quit
//!
//! The cookie jar lands next to the binary as `dialtone.cookies` (override
//! with DIALTONE_JAR).

use std::io::{self, BufRead, Write};

use dialtone_client::{BackendError, Client, Conversation};

#[tokio::main]
async fn main() {
    // Enable logging: RUST_LOG=dialtone_client=info cargo run -p dialtone-app
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let jar = std::env::var("DIALTONE_JAR").unwrap_or_else(|_| "dialtone.cookies".to_string());
    let mut client = Client::open_default(jar)?;

    if client.is_authed_quick() {
        // Saved cookies may still be good; only fall back to credentials
        // when the account page rejects them.
        match client.ensure_authed(false).await {
            Ok(()) => println!("✅ Session restored from cookie jar"),
            Err(e) if e.is_auth() => credential_login(&mut client).await?,
            Err(e) => return Err(e.into()),
        }
    } else {
        credential_login(&mut client).await?;
    }

    if let Some(account) = client.account_number() {
        println!("📞 Account {account}");
    }
    if client.callback_number().is_empty() {
        if let Some((number, label)) = client.callback_numbers().iter().next() {
            println!("ℹ️  No callback number set; try: cb {number}   ({label})");
        }
    }

    let counts = client.get_unread_counts().await?;
    if !counts.is_empty() {
        let mut labels: Vec<_> = counts.iter().collect();
        labels.sort();
        let rendered: Vec<String> = labels.iter().map(|(l, n)| format!("{l}: {n}")).collect();
        println!("🔔 Unread — {}", rendered.join(", "));
    }

    loop {
        let line = prompt("dialtone> ")?;
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let result = match cmd {
            "q" | "quit" => break,
            "v" => client.get_voicemails().await.map(|c| print_conversations(&c)),
            "t" => client.get_texts().await.map(|c| print_conversations(&c)),
            "r" => client.get_recent().await.map(|c| print_conversations(&c)),
            "c" => client.call(rest.trim()).await.map(|()| println!("📲 Ringing your callback number …")),
            "cb" => client.set_callback_number(rest.trim()).await.map(|()| println!("✅ Callback number set")),
            "s" => match rest.split_once(' ') {
                Some((number, text)) => client
                    .send_sms(number, text)
                    .await
                    .map(|()| println!("💬 Sent")),
                None => {
                    println!("usage: s <number> <text…>");
                    Ok(())
                }
            },
            "" => Ok(()),
            other => {
                println!("unknown command {other:?} (v, t, r, c, cb, s, q)");
                Ok(())
            }
        };
        if let Err(e) = result {
            report(e);
        }
    }

    Ok(())
}

async fn credential_login(client: &mut Client) -> Result<(), Box<dyn std::error::Error>> {
    let email = prompt("Email: ")?;
    let password = prompt("Password: ")?;
    client.login(email.trim(), password.trim()).await?;
    println!("✅ Logged in");
    Ok(())
}

fn print_conversations(conversations: &[Conversation]) {
    if conversations.is_empty() {
        println!("(nothing here)");
        return;
    }
    for c in conversations {
        let who = if c.name.is_empty() { &c.pretty_number } else { &c.name };
        let mut flags = String::new();
        if !c.is_read {
            flags.push('*');
        }
        if c.is_archived {
            flags.push('a');
        }
        println!("— {who} {flags}  [{}]  {}", c.rel_time, c.location);
        for m in &c.messages {
            println!("    {}: {}", m.who_from, m.full_text());
        }
    }
}

fn report(e: BackendError) {
    if e.is_auth() {
        eprintln!("✗ {e} — run again to re-enter credentials");
    } else {
        eprintln!("✗ {e}");
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
