//! Terminal renderings of the dashboard views.

use anyhow::{Context, Result};
use desk_analytics::{
    aggregate_detailed, format_phone, transcript_by_date, ConversationStats, DateRange,
    ReportGenerator,
};
use desk_client::{
    filter_customers, CustomerClient, CustomerDirectory, LogQuery, MessageLogClient,
    MessageLogSource, SmsCustomerClient, SmsCustomerDirectory,
};
use desk_core::config::AppConfig;
use desk_core::types::{CustomerProfile, Direction};
use desk_view::{RefreshOutcome, SessionsView, ViewState};
use std::sync::Arc;

async fn resolve_profile(config: &AppConfig, customer: &str) -> Result<CustomerProfile> {
    let directory = CustomerClient::new(&config.upstream)?;
    match directory.find_by_phone(customer, None).await {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Ok(CustomerProfile::anonymous(customer.trim())),
        Err(e) => {
            tracing::warn!("Customer directory unavailable: {}", e);
            Ok(CustomerProfile::anonymous(customer.trim()))
        }
    }
}

fn display_name(profile: &CustomerProfile) -> String {
    if profile.name.is_empty() {
        format_phone(&profile.wa_id)
    } else {
        format!("{} ({})", profile.name, format_phone(&profile.wa_id))
    }
}

pub async fn sessions(
    config: &AppConfig,
    customer: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let range = DateRange::parse(from, to)?;
    let profile = resolve_profile(config, customer).await?;
    let source = Arc::new(MessageLogClient::new(&config.upstream)?);

    let view = SessionsView::new(source, profile);
    view.set_range(range.start, range.end);
    let outcome = view.refresh().await;
    tracing::debug!("Refresh finished: {:?}", outcome);

    let state = view.state();
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("Chat sessions for {}\n", display_name(view.profile()));
        match &state {
            ViewState::Ready { sessions, total } => {
                print!("{}", ReportGenerator::text_summary(sessions, &range));
                if sessions.len() < *total {
                    println!("\n  ({} of {} sessions in range)", sessions.len(), total);
                }
            }
            ViewState::Failed { error, .. } => {
                println!("  {}", state.message().unwrap_or_default());
                tracing::debug!("Fetch error: {}", error);
            }
            other => println!("  {}", other.message().unwrap_or_default()),
        }
        let skipped = view.skipped();
        if !skipped.is_empty() {
            println!("\n  {} malformed record(s) skipped", skipped.len());
        }
    }

    if outcome == RefreshOutcome::Failed {
        anyhow::bail!("failed to load sessions for {}", customer);
    }
    Ok(())
}

pub async fn conversation(config: &AppConfig, phone: &str, date: Option<&str>) -> Result<()> {
    let date = DateRange::parse(date, None)?.start;
    let client = MessageLogClient::new(&config.upstream)?;
    let messages = client
        .fetch_all(&LogQuery::new(phone).on(date))
        .await
        .with_context(|| format!("loading conversation for {}", phone))?;

    let stats = ConversationStats::from_messages(&messages);
    println!("Conversation with {}", format_phone(phone));
    println!(
        "  {} messages ({} incoming, {} outgoing)",
        stats.total, stats.incoming, stats.outgoing
    );
    if let (Some(first), Some(last)) = (stats.first_at, stats.last_at) {
        println!("  {} to {}", first.format("%Y-%m-%d %H:%M"), last.format("%Y-%m-%d %H:%M"));
    }

    for (day, msgs) in transcript_by_date(&messages) {
        println!("\n── {} ──", day.format("%A, %B %d, %Y"));
        for msg in msgs {
            let time = msg
                .parsed_timestamp()
                .map(|ts| ts.format("%H:%M").to_string())
                .unwrap_or_default();
            let who = match msg.direction {
                Direction::Incoming => "customer",
                Direction::Outgoing => "assistant",
                Direction::Unknown => "?",
            };
            println!("  [{}] {:>9}: {}", time, who, msg.body);
        }
    }
    Ok(())
}

pub async fn report(
    config: &AppConfig,
    customer: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let range = DateRange::parse(from, to)?;
    let profile = resolve_profile(config, customer).await?;
    let client = MessageLogClient::new(&config.upstream)?;
    let messages = client
        .fetch_all(&LogQuery::new(profile.wa_id.clone()))
        .await
        .with_context(|| format!("loading sessions for {}", customer))?;

    let aggregation = aggregate_detailed(&messages, &profile);
    let sessions = range.apply(&aggregation.sessions);
    print!("{}", ReportGenerator::customer_report(&profile, &sessions, &range));
    Ok(())
}

pub async fn customers(
    config: &AppConfig,
    query: Option<&str>,
    sms_uid: Option<&str>,
) -> Result<()> {
    let all = match sms_uid {
        Some(uid) => {
            SmsCustomerClient::new(&config.upstream)?
                .list_sms_customers(uid, None)
                .await?
        }
        None => CustomerClient::new(&config.upstream)?.list_customers(None).await?,
    };
    let matches = filter_customers(&all, query.unwrap_or_default());

    if matches.is_empty() {
        println!("No customers found.");
        return Ok(());
    }
    for customer in &matches {
        let experience = customer.experience().unwrap_or("-");
        println!(
            "  {:<24} {:<18} {}",
            customer.name,
            format_phone(&customer.wa_id),
            experience
        );
    }
    println!("\n{} of {} customers", matches.len(), all.len());
    Ok(())
}
