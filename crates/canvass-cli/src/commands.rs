//! One handler per subcommand. Each runs against a restored session.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use canvass_core::engagement::{run_like, run_share, EngagementAction, Snapshot};
use canvass_core::models::{
    AvatarUpload, CampaignMessage, CampaignQuery, ProfileUpdate, RegistrationForm, UserRecord,
    WithdrawalRequest,
};
use canvass_core::points::{format_cedis, request_withdrawal};
use canvass_core::utils::{format_date, single_line, truncate_string};
use canvass_core::{Config, SessionManager};

use crate::cli::{ProfileCommand, RegisterArgs, ScopeArg, SortArg};

/// Environment variable holding the password for non-interactive use
const PASSWORD_ENV: &str = "CANVASS_PASSWORD";

/// Width of the content preview in campaign listings
const PREVIEW_WIDTH: usize = 72;

fn require_session(manager: &SessionManager) -> Result<()> {
    if !manager.is_authenticated() {
        bail!("Not logged in. Run `canvass login` first.");
    }
    Ok(())
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_password(label: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        debug!("Using password from environment");
        return Ok(password);
    }
    rpassword::prompt_password(format!("{}: ", label)).context("Failed to read password")
}

fn print_user(user: &UserRecord) {
    println!("{}", user.display_name());
    if let Some(ref email) = user.email {
        println!("  Email:        {}", email);
    }
    if let Some(ref phone) = user.phone {
        println!("  Phone:        {}", phone);
    }
    if let Some(ref region) = user.region_id {
        println!("  Region:       {}", region);
    }
    if let Some(ref constituency) = user.constituency_id {
        println!("  Constituency: {}", constituency);
    }
}

pub async fn login(manager: &SessionManager, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt_line("Email")?,
    };
    if email.is_empty() {
        bail!("An email address is required");
    }
    let password = read_password("Password")?;

    let session = manager.try_login(&email, &password).await?;

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        debug!(error = %e, "Could not remember email");
    }

    match session.user() {
        Some(user) => println!("Logged in as {}", user.display_name()),
        None => println!("Logged in"),
    }
    Ok(())
}

fn load_avatar(path: &Path) -> Result<AvatarUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read avatar {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        other => bail!("Unsupported avatar type {:?}, use PNG or JPEG", other),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("avatar")
        .to_string();
    Ok(AvatarUpload {
        file_name,
        mime_type: mime_type.to_string(),
        bytes,
    })
}

pub async fn register(manager: &SessionManager, config: &mut Config, args: RegisterArgs) -> Result<()> {
    let avatar = args.avatar.as_deref().map(load_avatar).transpose()?;
    let password = read_password("Password")?;
    let password_confirmation = match std::env::var(PASSWORD_ENV) {
        Ok(_) => password.clone(),
        Err(_) => read_password("Confirm password")?,
    };
    if password != password_confirmation {
        bail!("Passwords do not match");
    }

    let form = RegistrationForm {
        name: args.name,
        email: args.email.clone(),
        phone: args.phone,
        password,
        password_confirmation,
        region_id: args.region,
        constituency_id: args.constituency,
        avatar,
    };
    let session = manager.try_register(&form).await?;

    config.last_email = Some(args.email);
    if let Err(e) = config.save() {
        debug!(error = %e, "Could not remember email");
    }

    let name = session.user().map(UserRecord::display_name).unwrap_or("new member");
    println!("Welcome, {}!", name);
    Ok(())
}

pub async fn logout(manager: &SessionManager) -> Result<()> {
    if !manager.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }
    // Local state is already cleared; wait only so the notification is not cut off.
    if let Err(e) = manager.logout().await {
        debug!(error = %e, "Logout notification task failed");
    }
    println!("Logged out");
    Ok(())
}

pub async fn whoami(manager: &SessionManager) -> Result<()> {
    require_session(manager)?;
    let client = manager.client();
    let (user, points) = futures::try_join!(client.fetch_profile(), client.fetch_points())?;
    manager.update_user(user.clone());

    print_user(&user);
    println!(
        "  Points:       {} ({})",
        points.balance,
        points.cash_display()
    );
    Ok(())
}

fn print_campaign(message: &CampaignMessage) {
    let id = message.id.as_deref().unwrap_or("-");
    println!("[{}] {}", id, message.title);
    let date = message.created_at.as_deref().map(format_date).unwrap_or_default();
    println!(
        "    by {}  {}  likes {}{}  shares {}",
        message.author_name(),
        date,
        message.likes_count,
        if message.is_liked { " (you)" } else { "" },
        message.shares_count
    );
    let preview = truncate_string(&single_line(&message.content), PREVIEW_WIDTH);
    if !preview.is_empty() {
        println!("    {}", preview);
    }
}

pub async fn campaigns(manager: &SessionManager, scope: ScopeArg, sort: SortArg) -> Result<()> {
    require_session(manager)?;
    let query = CampaignQuery::new(scope.into(), sort.into());
    let messages = manager.client().fetch_campaigns(&query).await?;
    if messages.is_empty() {
        println!("No campaign messages for {} scope", query.scope);
        return Ok(());
    }
    for message in &messages {
        print_campaign(message);
    }
    Ok(())
}

/// The post as listed by default, or a bare one when it is not listed.
async fn find_message(manager: &SessionManager, id: &str) -> Result<CampaignMessage> {
    let messages = manager.client().fetch_campaigns(&CampaignQuery::default()).await?;
    Ok(match messages.into_iter().find(|m| m.id.as_deref() == Some(id)) {
        Some(message) => message,
        None => {
            debug!(id, "Post not in default listing, starting from zero");
            CampaignMessage {
                id: Some(id.to_string()),
                ..Default::default()
            }
        }
    })
}

pub async fn engage(manager: &SessionManager, id: &str, action: EngagementAction) -> Result<()> {
    require_session(manager)?;
    let mut message = find_message(manager, id).await?;
    let on_optimistic = |snapshot: Snapshot| {
        debug!(count = snapshot.count, active = snapshot.active, "Optimistic count");
    };
    let outcome = match action {
        EngagementAction::Like => run_like(manager.client(), &mut message, on_optimistic).await?,
        EngagementAction::Share => run_share(manager.client(), &mut message, on_optimistic).await?,
    };

    let verb = match (action, outcome.snapshot.active) {
        (EngagementAction::Like, true) => "Liked",
        (EngagementAction::Like, false) => "Unliked",
        (EngagementAction::Share, _) => "Shared",
    };
    let label = if message.title.is_empty() {
        format!("post {}", id)
    } else {
        format!("\"{}\"", message.title)
    };
    println!("{} {} ({} total)", verb, label, outcome.snapshot.count);
    if let Some(notice) = outcome.notice() {
        println!("{}", notice);
    }
    Ok(())
}

pub async fn points(manager: &SessionManager) -> Result<()> {
    require_session(manager)?;
    let points = manager.client().fetch_points().await?;
    println!("Balance: {} points ({})", points.balance, points.cash_display());
    println!("Available to withdraw: {}", format_cedis(points.max_withdrawal()));

    if points.withdrawal_history.is_empty() {
        println!("No withdrawals yet");
        return Ok(());
    }
    println!();
    println!("{:<12} {:>10}  {}", "Date", "Amount", "Status");
    for record in &points.withdrawal_history {
        let date = record.created_at.as_deref().map(format_date).unwrap_or_default();
        println!("{:<12} {:>10}  {}", date, format_cedis(record.amount), record.status);
    }
    Ok(())
}

pub async fn withdraw(manager: &SessionManager, amount: f64, phone: String, network: String) -> Result<()> {
    require_session(manager)?;
    let points = manager.client().fetch_points().await?;
    let request = WithdrawalRequest {
        amount,
        phone_number: phone,
        network,
    };
    let receipt = request_withdrawal(manager.client(), points.balance, &request).await?;
    info!(amount, "Withdrawal requested");
    println!(
        "{}",
        receipt
            .message
            .unwrap_or_else(|| format!("Withdrawal of {} requested", format_cedis(amount)))
    );
    Ok(())
}

pub async fn regions(manager: &SessionManager) -> Result<()> {
    let regions = manager.client().fetch_regions().await?;
    for region in &regions {
        println!("{:>6}  {}", region.id.as_deref().unwrap_or("-"), region.name);
    }
    Ok(())
}

pub async fn constituencies(manager: &SessionManager, region: &str) -> Result<()> {
    let constituencies = manager.client().fetch_constituencies(region).await?;
    if constituencies.is_empty() {
        println!("No constituencies found for region {}", region);
    }
    for constituency in &constituencies {
        println!("{:>6}  {}", constituency.id.as_deref().unwrap_or("-"), constituency.name);
    }
    Ok(())
}

pub async fn profile(manager: &SessionManager, command: ProfileCommand) -> Result<()> {
    require_session(manager)?;
    match command {
        ProfileCommand::Update { name, phone } => {
            let update = ProfileUpdate {
                name,
                phone,
                ..Default::default()
            };
            if update.is_empty() {
                bail!("Nothing to update; pass --name or --phone");
            }
            let user = manager.client().update_profile(&update).await?;
            manager.update_user(user.clone());
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
    }
    Ok(())
}
