//! Bot command handlers.

use tabled::Tabled;
use tokio::io::{AsyncBufReadExt, BufReader};

use botdesk_core::{
    Bot, CoreError, CreateBot, Dashboard, EntityId, ListObserver, ListParams, Page, Pagination,
    SortOrder, UpdateBot,
};

use crate::cli::{BotListArgs, BotsArgs, BotsCommand, GlobalOpts, OutputFormat, SortDirection};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BotRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Bot> for BotRow {
    fn from(b: &Bot) -> Self {
        Self {
            id: b.id.to_string(),
            name: b.name.clone(),
            active: if b.is_active { "yes" } else { "no" }.into(),
            description: b.description.clone().unwrap_or_default(),
            updated: b.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn bot_detail(b: &Bot) -> String {
    output::key_values(&[
        ("ID", b.id.to_string()),
        ("Name", b.name.clone()),
        ("Active", b.is_active.to_string()),
        (
            "Description",
            b.description.clone().unwrap_or_else(|| "-".into()),
        ),
        ("Created", b.created_at.to_rfc3339()),
        ("Updated", b.updated_at.to_rfc3339()),
    ])
}

fn print_bot(bot: &Bot, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, bot, bot_detail, |b| b.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_page(page: &Page<Bot>, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(global.output, &page.data, |b: &Bot| BotRow::from(b), |b| {
        b.id.to_string()
    })?;
    output::print_output(&out, global.quiet);
    if global.output == OutputFormat::Table && !global.quiet {
        eprintln!(
            "Page {} of {} ({} bots)",
            page.page,
            page.total_pages(),
            page.total
        );
    }
    Ok(())
}

fn sort_order(direction: SortDirection) -> SortOrder {
    match direction {
        SortDirection::Asc => SortOrder::Asc,
        SortDirection::Desc => SortOrder::Desc,
    }
}

/// Pagination seeded from list flags, sized from settings when `--page-size` is absent.
fn pagination(dashboard: &Dashboard, args: &BotListArgs) -> Pagination {
    let mut p = dashboard.pagination();
    if let Some(size) = args.page_size {
        p.set_page_size(size);
    }
    if let Some(ref term) = args.search {
        p.set_search(term.clone());
    }
    if let Some(ref sort_by) = args.sort_by {
        p.set_sort(sort_by.clone(), sort_order(args.order));
    }
    p.set_page(args.page);
    p
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: BotsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    dashboard.require_user()?;
    let bots = dashboard.bots();

    match args.command {
        BotsCommand::List(list) => {
            let params = pagination(dashboard, &list).params();
            let page = util::with_spinner("Loading bots", global, bots.list(&params)).await?;
            print_page(&page, global)
        }

        BotsCommand::Get { id } => {
            let bot = bots.get(&EntityId::from(id)).await?;
            print_bot(&bot, global)
        }

        BotsCommand::Create {
            name,
            description,
            inactive,
        } => {
            let input = CreateBot {
                name,
                description,
                is_active: !inactive,
            };
            let bot = util::with_spinner("Creating bot", global, bots.create(&input)).await?;
            util::flush_notifications(dashboard, global);
            print_bot(&bot, global)
        }

        BotsCommand::Update {
            id,
            name,
            description,
            active,
        } => {
            let input = UpdateBot {
                name,
                description,
                is_active: active,
            };
            let bot = bots.update(&EntityId::from(id), &input).await?;
            util::flush_notifications(dashboard, global);
            print_bot(&bot, global)
        }

        BotsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete bot '{id}'?"), "bots delete", global)? {
                return Ok(());
            }
            bots.delete(&EntityId::from(id)).await?;
            util::flush_notifications(dashboard, global);
            Ok(())
        }

        BotsCommand::BulkDelete { ids } => {
            let ids = util::parse_ids(&ids)?;
            if !util::confirm(
                &format!("Delete {} bots? This cannot be undone.", ids.len()),
                "bots bulk-delete",
                global,
            )? {
                return Ok(());
            }
            let deleted = bots.bulk_delete(&ids).await?;
            util::flush_notifications(dashboard, global);
            if global.output == OutputFormat::Plain {
                output::print_output(&deleted.to_string(), global.quiet);
            }
            Ok(())
        }

        BotsCommand::Browse(list) => browse(dashboard, &list, global).await,
    }
}

// ── Interactive browsing ────────────────────────────────────────────

const BROWSE_HELP: &str = "Type to search, a number to jump to a page, n/p to page, q to quit.";

/// Line-driven pager over the debounced search.
///
/// Every input line is treated like a keystroke burst: search terms are
/// committed only after the configured debounce delay, page moves
/// immediately, and a newer query always wins over a slower older one.
async fn browse(
    dashboard: &Dashboard,
    args: &BotListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let search = dashboard.debounced_search(pagination(dashboard, args));
    let observer = ListObserver::new();
    let mut params = search.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    show(dashboard, &observer, search.params(), global).await?;
    if !global.quiet {
        eprintln!("{BROWSE_HELP}");
    }

    loop {
        tokio::select! {
            changed = params.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = params.borrow_and_update().clone();
                show(dashboard, &observer, next, global).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "q" => break,
                    "n" => {
                        let total = observer.current().page.map_or(1, |p| p.total_pages());
                        search.next_page(total);
                    }
                    "p" => search.prev_page(),
                    input => match input.parse::<u32>() {
                        Ok(page) => search.set_page(page),
                        Err(_) => search.set_search(input),
                    },
                }
            }
        }
    }

    search.shutdown();
    Ok(())
}

async fn show(
    dashboard: &Dashboard,
    observer: &ListObserver<Bot>,
    params: ListParams,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match dashboard.bots().observe_list(observer, params).await {
        Ok(page) => print_page(&page, global),
        Err(CoreError::Cancelled) => Ok(()),
        Err(e) if e.requires_login() => Err(e.into()),
        Err(e) => {
            let notice = e.notice();
            eprintln!("Could not load bots: {} ({})", notice.message, notice.code);
            Ok(())
        }
    }
}
