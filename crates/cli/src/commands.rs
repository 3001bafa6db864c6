//! Command parsing and guarded dispatch.
//!
//! Every mutating handler resolves its guard chain BEFORE touching any
//! store, so a failed check aborts with no partial side effects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use solstice_auth::{
    roles_with, AuthError, CredentialStore, Guard, GuardChain, Permission, Role, SessionState,
    User,
};
use solstice_contracts::Contract;
use solstice_core::{ContractId, CustomerId, DomainError, EventId};
use solstice_events::Event;
use solstice_parties::{ContactInfo, Customer};

use crate::context::AppContext;

/// Result of one dispatched line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Message(String),
    Quit,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn usage(msg: impl Into<String>) -> CliError {
    CliError::Usage(msg.into())
}

const HELP: &str = "\
commands:
  login <username> <password>      logout      whoami      refresh
  user create <username> <password> <role> | set-role <username> <role>
       reset-password <username> <password> | deactivate <username>
       activate <username> | list
  customer create name=.. [company=..] [email=..] [phone=..]
       edit <id> [name=..] [company=..] [email=..] [phone=..] | list
  contract create customer=<id> amount=<cents> [gestion=<username>]
       edit <id> [amount=..] [gestion=..] | sign <id> | pay <id> amount=..
       list [unsigned] [unpaid]
  event create contract=<id> name=.. start=<rfc3339> end=<rfc3339>
       location=.. [attendees=N]
       edit <id> [location=..] [attendees=..] [notes=..]
       reschedule <id> start=.. end=.. | assign-support <id> support=<username>
       delete <id> | list [unassigned] [mine]
  help      exit";

/// Split a command line into tokens, honoring double quotes so values like
/// `name="Kevin Casey"` stay one token.
pub fn split_args(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_any = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_any = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_any && !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                seen_any = false;
            }
            c => {
                current.push(c);
                seen_any = true;
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Split tokens into positional words and `key=value` options.
fn parse_opts(args: &[String]) -> (Vec<&str>, BTreeMap<&str, &str>) {
    let mut positional = Vec::new();
    let mut opts = BTreeMap::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => {
                opts.insert(key, value);
            }
            None => positional.push(arg.as_str()),
        }
    }
    (positional, opts)
}

fn require<'a>(opts: &BTreeMap<&str, &'a str>, key: &str, hint: &str) -> Result<&'a str, CliError> {
    opts.get(key)
        .copied()
        .ok_or_else(|| usage(format!("missing {key}=..; usage: {hint}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| usage(format!("invalid time '{s}' (want RFC 3339): {e}")))
}

fn parse_amount(s: &str) -> Result<u64, CliError> {
    s.parse::<u64>()
        .map_err(|_| usage(format!("invalid amount '{s}' (want whole cents)")))
}

/// Dispatch one input line against the application context.
pub fn dispatch(ctx: &AppContext, line: &str) -> Result<Outcome, CliError> {
    let args = split_args(line);
    let Some(command) = args.first() else {
        return Ok(Outcome::Message(String::new()));
    };

    match command.as_str() {
        "help" => Ok(Outcome::Message(HELP.to_string())),
        "exit" | "quit" => Ok(Outcome::Quit),
        "login" => login(ctx, &args[1..]),
        "logout" => {
            ctx.auth.logout()?;
            Ok(Outcome::Message("logged out".into()))
        }
        "whoami" => whoami(ctx),
        "refresh" => {
            let claims = ctx.auth.refresh()?;
            Ok(Outcome::Message(format!(
                "session refreshed for {} ({})",
                claims.username, claims.role
            )))
        }
        "user" => user_command(ctx, &args[1..]),
        "customer" => customer_command(ctx, &args[1..]),
        "contract" => contract_command(ctx, &args[1..]),
        "event" => event_command(ctx, &args[1..]),
        other => Err(usage(format!("unknown command '{other}'; try 'help'"))),
    }
}

fn login(ctx: &AppContext, args: &[String]) -> Result<Outcome, CliError> {
    let [username, password] = args else {
        return Err(usage("usage: login <username> <password>"));
    };
    let claims = ctx.auth.login(username, password)?;
    Ok(Outcome::Message(format!(
        "logged in as {} ({})",
        claims.username, claims.role
    )))
}

fn whoami(ctx: &AppContext) -> Result<Outcome, CliError> {
    let message = match ctx.auth.current()? {
        SessionState::Authenticated(claims) => {
            format!("{} ({})", claims.username, claims.role)
        }
        SessionState::Expired(claims) => {
            format!("{}: session expired; run 'refresh' or log in again", claims.username)
        }
        SessionState::Anonymous => "not logged in".to_string(),
        SessionState::Invalid => "session is invalid; log in again".to_string(),
    };
    Ok(Outcome::Message(message))
}

// ─── users ───────────────────────────────────────────────────────────────────

fn user_command(ctx: &AppContext, args: &[String]) -> Result<Outcome, CliError> {
    let Some(action) = args.first() else {
        return Err(usage("usage: user <create|set-role|reset-password|deactivate|activate|list> ..."));
    };
    let rest = &args[1..];

    match action.as_str() {
        "create" => {
            let claims = ctx.guard(&GuardChain::can(Permission::CreateUser))?;
            let [username, password, role] = rest else {
                return Err(usage("usage: user create <username> <password> <role>"));
            };
            let role: Role = role.parse()?;
            if ctx.users.find_by_username(&username.to_lowercase())?.is_some() {
                return Err(usage(format!("user '{username}' already exists")));
            }
            let user = User::new(
                username,
                solstice_auth::hash_password(password)?,
                role,
                Utc::now(),
            )?;
            ctx.users.persist(&user)?;
            tracing::info!(actor = %claims.username, username = user.username(), %role, "user created");
            Ok(Outcome::Message(format!("created {} ({role})", user.username())))
        }
        "set-role" => {
            let claims = ctx.guard(&GuardChain::can(Permission::EditUser))?;
            let [username, role] = rest else {
                return Err(usage("usage: user set-role <username> <role>"));
            };
            let role: Role = role.parse()?;
            let mut user = find_user(ctx, username)?;
            user.set_role(role, claims.role, Utc::now())?;
            ctx.users.persist(&user)?;
            Ok(Outcome::Message(format!("{username} is now {role}")))
        }
        "reset-password" => {
            ctx.guard(&GuardChain::can(Permission::EditUser))?;
            let [username, password] = rest else {
                return Err(usage("usage: user reset-password <username> <password>"));
            };
            let mut user = find_user(ctx, username)?;
            user.set_password_hash(solstice_auth::hash_password(password)?, Utc::now());
            ctx.users.persist(&user)?;
            Ok(Outcome::Message(format!("password reset for {username}")))
        }
        "deactivate" => {
            let claims = ctx.guard(&GuardChain::can(Permission::DeactivateUser))?;
            let [username] = rest else {
                return Err(usage("usage: user deactivate <username>"));
            };
            let mut user = find_user(ctx, username)?;
            user.deactivate(Utc::now())?;
            ctx.users.persist(&user)?;
            tracing::info!(actor = %claims.username, username = user.username(), "user deactivated");
            Ok(Outcome::Message(format!("{username} deactivated")))
        }
        "activate" => {
            ctx.guard(&GuardChain::can(Permission::EditUser))?;
            let [username] = rest else {
                return Err(usage("usage: user activate <username>"));
            };
            let mut user = find_user(ctx, username)?;
            user.activate(Utc::now())?;
            ctx.users.persist(&user)?;
            Ok(Outcome::Message(format!("{username} activated")))
        }
        "list" => {
            ctx.guard(&GuardChain::can(Permission::ReadAccess))?;
            let mut lines = Vec::new();
            for user in ctx.users.all_users()? {
                let state = if user.is_active() { "active" } else { "inactive" };
                lines.push(format!(
                    "{:<20} {:<12} {state}",
                    user.username(),
                    user.role().as_str()
                ));
            }
            Ok(Outcome::Message(listing(lines, "no users")))
        }
        other => Err(usage(format!("unknown user action '{other}'"))),
    }
}

fn find_user(ctx: &AppContext, username: &str) -> Result<User, CliError> {
    ctx.users
        .find_by_username(&username.to_lowercase())?
        .ok_or_else(|| CliError::NotFound(format!("no user '{username}'")))
}

/// Validate that `username` can serve as a contact requiring `permission`,
/// using the permission model's reverse query for the eligible role set.
fn ensure_eligible_contact(
    ctx: &AppContext,
    username: &str,
    permission: Permission,
    label: &str,
) -> Result<(), CliError> {
    let user = find_user(ctx, username)?;
    if !user.is_active() {
        return Err(usage(format!("user '{username}' is deactivated")));
    }
    let eligible = roles_with(permission);
    if !eligible.contains(&user.role()) {
        return Err(usage(format!(
            "user '{username}' ({}) cannot be a {label} contact; requires one of: {}",
            user.role(),
            eligible
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    Ok(())
}

// ─── customers ───────────────────────────────────────────────────────────────

fn customer_command(ctx: &AppContext, args: &[String]) -> Result<Outcome, CliError> {
    let Some(action) = args.first() else {
        return Err(usage("usage: customer <create|edit|list> ..."));
    };
    let (positional, opts) = parse_opts(&args[1..]);

    match action.as_str() {
        "create" => {
            let claims = ctx.guard(&GuardChain::can(Permission::CreateCustomer))?;
            let name = require(&opts, "name", "customer create name=..")?;
            let contact = ContactInfo {
                email: opts.get("email").map(|s| s.to_string()),
                phone: opts.get("phone").map(|s| s.to_string()),
            };
            let mut customer = Customer::new(
                CustomerId::new(),
                name,
                opts.get("company").map(|s| s.to_string()),
                contact,
                Utc::now(),
            )?;
            // The creating salesperson becomes the responsible contact.
            customer.assign_commercial(&claims.username, Utc::now())?;
            ctx.crm.upsert_customer(&customer)?;
            Ok(Outcome::Message(format!("created customer {}", customer.id())))
        }
        "edit" => {
            ctx.guard(&GuardChain::can(Permission::EditCustomer))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: customer edit <id> [name=..] [company=..] [email=..] [phone=..]"));
            };
            let id: CustomerId = id.parse()?;
            let mut customer = ctx
                .crm
                .find_customer(id)?
                .ok_or_else(|| CliError::NotFound(format!("no customer {id}")))?;

            let company = opts.get("company").map(|s| {
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            });
            let contact = if opts.contains_key("email") || opts.contains_key("phone") {
                Some(ContactInfo {
                    email: opts
                        .get("email")
                        .map(|s| s.to_string())
                        .or_else(|| customer.contact().email.clone()),
                    phone: opts
                        .get("phone")
                        .map(|s| s.to_string())
                        .or_else(|| customer.contact().phone.clone()),
                })
            } else {
                None
            };
            customer.update_details(opts.get("name").copied(), company, contact, Utc::now())?;
            ctx.crm.upsert_customer(&customer)?;
            Ok(Outcome::Message(format!("updated customer {id}")))
        }
        "list" => {
            ctx.guard(&GuardChain::can(Permission::ReadAccess))?;
            let mut lines = Vec::new();
            for customer in ctx.crm.customers()? {
                lines.push(format!(
                    "{}  {:<24} company={}  commercial={}",
                    customer.id(),
                    customer.full_name(),
                    customer.company().unwrap_or("-"),
                    customer.commercial_contact().unwrap_or("-"),
                ));
            }
            Ok(Outcome::Message(listing(lines, "no customers")))
        }
        other => Err(usage(format!("unknown customer action '{other}'"))),
    }
}

// ─── contracts ───────────────────────────────────────────────────────────────

fn contract_command(ctx: &AppContext, args: &[String]) -> Result<Outcome, CliError> {
    let Some(action) = args.first() else {
        return Err(usage("usage: contract <create|edit|sign|pay|list> ..."));
    };
    let (positional, opts) = parse_opts(&args[1..]);

    match action.as_str() {
        "create" => {
            let claims = ctx.guard(&GuardChain::can(Permission::CreateContract))?;
            let customer_id: CustomerId =
                require(&opts, "customer", "contract create customer=<id> amount=<cents>")?.parse()?;
            if ctx.crm.find_customer(customer_id)?.is_none() {
                return Err(CliError::NotFound(format!("no customer {customer_id}")));
            }
            let amount = parse_amount(require(&opts, "amount", "contract create customer=<id> amount=<cents>")?)?;

            let mut contract = Contract::new(ContractId::new(), customer_id, amount, Utc::now())?;
            let gestion = opts.get("gestion").copied().unwrap_or(claims.username.as_str());
            ensure_eligible_contact(ctx, gestion, Permission::CreateContract, "gestion")?;
            contract.assign_gestion(gestion, Utc::now())?;
            ctx.crm.upsert_contract(&contract)?;
            Ok(Outcome::Message(format!("created contract {}", contract.id())))
        }
        "edit" => {
            ctx.guard(&GuardChain::can(Permission::EditContract))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: contract edit <id> [amount=..] [gestion=..]"));
            };
            let mut contract = find_contract(ctx, id)?;
            if let Some(amount) = opts.get("amount") {
                contract.set_total_amount(parse_amount(amount)?, Utc::now())?;
            }
            if let Some(gestion) = opts.get("gestion") {
                ensure_eligible_contact(ctx, gestion, Permission::CreateContract, "gestion")?;
                contract.assign_gestion(gestion, Utc::now())?;
            }
            ctx.crm.upsert_contract(&contract)?;
            Ok(Outcome::Message(format!("updated contract {}", contract.id())))
        }
        "sign" => {
            ctx.guard(&GuardChain::can(Permission::EditContract))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: contract sign <id>"));
            };
            let mut contract = find_contract(ctx, id)?;
            contract.sign(Utc::now())?;
            ctx.crm.upsert_contract(&contract)?;
            Ok(Outcome::Message(format!("contract {} signed", contract.id())))
        }
        "pay" => {
            ctx.guard(&GuardChain::can(Permission::EditContract))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: contract pay <id> amount=<cents>"));
            };
            let mut contract = find_contract(ctx, id)?;
            let amount = parse_amount(require(&opts, "amount", "contract pay <id> amount=<cents>")?)?;
            contract.record_payment(amount, Utc::now())?;
            ctx.crm.upsert_contract(&contract)?;
            Ok(Outcome::Message(format!(
                "recorded payment; {} still due on {}",
                contract.amount_due(),
                contract.id()
            )))
        }
        "list" => {
            let filters: Vec<&str> = positional;
            let chain = if filters.is_empty() {
                GuardChain::can(Permission::ReadAccess)
            } else {
                GuardChain::can(Permission::ReadAccess).with(Guard::Can(Permission::SortRecords))
            };
            ctx.guard(&chain)?;

            let mut lines = Vec::new();
            for contract in ctx.crm.contracts()? {
                if filters.contains(&"unsigned") && contract.is_signed() {
                    continue;
                }
                if filters.contains(&"unpaid") && contract.is_fully_paid() {
                    continue;
                }
                let status = if contract.is_signed() { "signed" } else { "unsigned" };
                lines.push(format!(
                    "{}  customer={}  total={}  due={}  {status}  gestion={}",
                    contract.id(),
                    contract.customer_id(),
                    contract.total_amount(),
                    contract.amount_due(),
                    contract.gestion_contact().unwrap_or("-"),
                ));
            }
            Ok(Outcome::Message(listing(lines, "no contracts")))
        }
        other => Err(usage(format!("unknown contract action '{other}'"))),
    }
}

fn find_contract(ctx: &AppContext, id: &str) -> Result<Contract, CliError> {
    let id: ContractId = id.parse()?;
    ctx.crm
        .find_contract(id)?
        .ok_or_else(|| CliError::NotFound(format!("no contract {id}")))
}

// ─── events ──────────────────────────────────────────────────────────────────

fn event_command(ctx: &AppContext, args: &[String]) -> Result<Outcome, CliError> {
    let Some(action) = args.first() else {
        return Err(usage("usage: event <create|edit|reschedule|assign-support|delete|list> ..."));
    };
    let (positional, opts) = parse_opts(&args[1..]);

    match action.as_str() {
        "create" => {
            ctx.guard(&GuardChain::can(Permission::CreateEvent))?;
            let hint = "event create contract=<id> name=.. start=.. end=.. location=..";
            let contract_id: ContractId = require(&opts, "contract", hint)?.parse()?;
            if ctx.crm.find_contract(contract_id)?.is_none() {
                return Err(CliError::NotFound(format!("no contract {contract_id}")));
            }
            let attendees = match opts.get("attendees") {
                Some(s) => s
                    .parse::<u32>()
                    .map_err(|_| usage(format!("invalid attendees '{s}'")))?,
                None => 0,
            };
            let event = Event::new(
                EventId::new(),
                contract_id,
                require(&opts, "name", hint)?,
                parse_time(require(&opts, "start", hint)?)?,
                parse_time(require(&opts, "end", hint)?)?,
                require(&opts, "location", hint)?,
                attendees,
                Utc::now(),
            )?;
            ctx.crm.upsert_event(&event)?;
            Ok(Outcome::Message(format!("created event {}", event.id())))
        }
        "edit" => {
            ctx.guard(&GuardChain::can(Permission::EditEvent))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: event edit <id> [location=..] [attendees=..] [notes=..]"));
            };
            let mut event = find_event(ctx, id)?;
            let attendees = match opts.get("attendees") {
                Some(s) => Some(
                    s.parse::<u32>()
                        .map_err(|_| usage(format!("invalid attendees '{s}'")))?,
                ),
                None => None,
            };
            event.update_details(
                opts.get("location").copied(),
                attendees,
                opts.get("notes").copied(),
                Utc::now(),
            )?;
            ctx.crm.upsert_event(&event)?;
            Ok(Outcome::Message(format!("updated event {}", event.id())))
        }
        "reschedule" => {
            ctx.guard(&GuardChain::can(Permission::EditEvent))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: event reschedule <id> start=.. end=.."));
            };
            let mut event = find_event(ctx, id)?;
            let start = parse_time(require(&opts, "start", "event reschedule <id> start=.. end=..")?)?;
            let end = parse_time(require(&opts, "end", "event reschedule <id> start=.. end=..")?)?;
            event.reschedule(start, end, Utc::now())?;
            ctx.crm.upsert_event(&event)?;
            Ok(Outcome::Message(format!("rescheduled event {}", event.id())))
        }
        "assign-support" => {
            ctx.guard(&GuardChain::can(Permission::AssignSupport))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: event assign-support <id> support=<username>"));
            };
            let mut event = find_event(ctx, id)?;
            let support = require(&opts, "support", "event assign-support <id> support=<username>")?;
            ensure_eligible_contact(ctx, support, Permission::EditEvent, "support")?;
            event.assign_support(support, Utc::now())?;
            ctx.crm.upsert_event(&event)?;
            Ok(Outcome::Message(format!(
                "event {} assigned to {support}",
                event.id()
            )))
        }
        "delete" => {
            ctx.guard(&GuardChain::can(Permission::DeleteEvent))?;
            let [id] = positional.as_slice() else {
                return Err(usage("usage: event delete <id>"));
            };
            let id: EventId = id.parse()?;
            if !ctx.crm.delete_event(id)? {
                return Err(CliError::NotFound(format!("no event {id}")));
            }
            Ok(Outcome::Message(format!("deleted event {id}")))
        }
        "list" => {
            let filters: Vec<&str> = positional;
            let chain = if filters.is_empty() {
                GuardChain::can(Permission::ReadAccess)
            } else {
                GuardChain::can(Permission::ReadAccess).with(Guard::Can(Permission::SortRecords))
            };
            let claims = ctx.guard(&chain)?;

            let mut lines = Vec::new();
            for event in ctx.crm.events()? {
                if filters.contains(&"unassigned") && !event.needs_support() {
                    continue;
                }
                if filters.contains(&"mine") && event.support_contact() != Some(claims.username.as_str()) {
                    continue;
                }
                lines.push(format!(
                    "{}  {:<24} {} → {}  support={}  attendees={}",
                    event.id(),
                    event.name(),
                    event.starts_at().format("%Y-%m-%d %H:%M"),
                    event.ends_at().format("%Y-%m-%d %H:%M"),
                    event.support_contact().unwrap_or("-"),
                    event.attendees(),
                ));
            }
            Ok(Outcome::Message(listing(lines, "no events")))
        }
        other => Err(usage(format!("unknown event action '{other}'"))),
    }
}

fn find_event(ctx: &AppContext, id: &str) -> Result<Event, CliError> {
    let id: EventId = id.parse()?;
    ctx.crm
        .find_event(id)?
        .ok_or_else(|| CliError::NotFound(format!("no event {id}")))
}

fn listing(lines: Vec<String>, empty: &str) -> String {
    if lines.is_empty() {
        format!("({empty})")
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_handles_plain_words() {
        assert_eq!(split_args("user list"), vec!["user", "list"]);
        assert_eq!(split_args("   "), Vec::<String>::new());
    }

    #[test]
    fn split_args_keeps_quoted_values_together() {
        assert_eq!(
            split_args(r#"customer create name="Kevin Casey" company="Cool Startup LLC""#),
            vec![
                "customer",
                "create",
                "name=Kevin Casey",
                "company=Cool Startup LLC"
            ]
        );
    }

    #[test]
    fn split_args_keeps_empty_quoted_values() {
        assert_eq!(split_args(r#"edit company="""#), vec!["edit", "company="]);
    }

    #[test]
    fn parse_opts_separates_positionals_from_options() {
        let args: Vec<String> = vec!["abc".into(), "amount=5000".into(), "unsigned".into()];
        let (positional, opts) = parse_opts(&args);
        assert_eq!(positional, vec!["abc", "unsigned"]);
        assert_eq!(opts.get("amount"), Some(&"5000"));
    }

    #[test]
    fn parse_time_accepts_rfc3339() {
        assert!(parse_time("2026-06-04T18:00:00+02:00").is_ok());
        assert!(parse_time("June 4th").is_err());
    }
}
