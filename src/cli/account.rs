//! login / logout / whoami / health

use std::error::Error;
use std::io::{self, BufRead, Write};

use crate::cli::Context;
use crate::core::auth_service::AuthService;
use crate::utils::password::prompt_password;

fn auth_service(context: &Context) -> AuthService {
    AuthService::new(context.client.clone(), context.config.device_info.clone())
}

fn prompt_line(prompt: &str) -> Result<String, Box<dyn Error>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub async fn run_login(
    context: &Context,
    username: Option<String>,
    password_stdin: bool,
) -> Result<(), Box<dyn Error>> {
    let username = match username {
        Some(name) => name,
        None => prompt_line("Username: ")?,
    };
    if username.is_empty() {
        return Err("Username cannot be empty".into());
    }

    let password = if password_stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        prompt_password("Password: ")?
    };
    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    match auth_service(context).login(&username, &password).await {
        Ok(response) => {
            println!("✅ Logged in as {}", response.username);
            Ok(())
        }
        Err(err) => Err(format!("Login failed: {}", err.user_message()).into()),
    }
}

pub async fn run_logout(context: &Context) -> Result<(), Box<dyn Error>> {
    let auth = auth_service(context);
    if !auth.is_logged_in()? {
        println!("Not logged in.");
        return Ok(());
    }
    auth.logout().await?;
    println!("✅ Logged out");
    Ok(())
}

pub async fn run_whoami(context: &Context) -> Result<(), Box<dyn Error>> {
    let auth = auth_service(context);
    if !auth.is_logged_in()? {
        println!("Not logged in. Run 'kbchat login' first.");
        return Ok(());
    }

    match auth.current_user().await {
        Ok(user) => println!("{}", user.username),
        Err(err) if err.is_unauthorized() => {
            return Err(format!(
                "{}\nYour session has ended. Run 'kbchat login' again.",
                err.user_message()
            )
            .into());
        }
        Err(err) => match auth.stored_username()? {
            Some(name) => {
                eprintln!("⚠️  Could not reach the server: {}", err.user_message());
                println!("{name} (offline)");
            }
            None => return Err(err.into()),
        },
    }
    Ok(())
}

pub async fn run_health(context: &Context) -> Result<(), Box<dyn Error>> {
    match context.client.health().await {
        Ok(health) => {
            println!("{}: {} ({})", context.client.base_url(), health.status, health.message);
            Ok(())
        }
        Err(err) => {
            Err(format!("{}: {}", context.client.base_url(), err.user_message()).into())
        }
    }
}
