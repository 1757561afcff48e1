use std::time::Duration;

use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use chrono::Local;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::PlannerResult;
use crate::fetch::{download_snapshot, HttpPageSource};
use crate::history::PriceHistory;
use crate::loader::{SnapshotCache, SnapshotStore};
use crate::model::{
    Direction, MarketKind, PlannedItem, PriceChange, Priority, SortKey, UNSAMPLED,
};
use crate::planner::{NewItem, Planner};
use crate::store::ItemStore;

pub const HELP: &str = "
Commands:
  help, ?             Show this list
  add                 Add an item to the purchase list
  remove              Remove every item whose name contains the text
  save                Save the purchase list
  updateah            Download fresh auction house data (do this before update)
  update              Re-estimate AH and BIN prices for tracked items
  list [key]          List items, optionally sorted by
                        name, priority, usercost, ahcost, bincost
  history <name>      Show recorded AH/BIN prices for an item
  total               Expected cost of the whole list
  quit, exit          Leave (unsaved changes are lost)
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Add,
    Remove,
    Save,
    UpdateAh,
    Update,
    List(Option<SortKey>),
    History(String),
    Total,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> PlannerResult<Option<Command>> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };

        let cmd = match head.to_lowercase().as_str() {
            "" => return Ok(None),
            "?" | "help" => Command::Help,
            "add" => Command::Add,
            "remove" => Command::Remove,
            "save" => Command::Save,
            "updateah" => Command::UpdateAh,
            "update" => Command::Update,
            "list" if rest.is_empty() => Command::List(None),
            "list" => Command::List(Some(rest.parse()?)),
            "history" => Command::History(rest.to_string()),
            "total" => Command::Total,
            "quit" | "exit" => Command::Quit,
            _ => return Ok(None),
        };
        Ok(Some(cmd))
    }
}

pub fn format_coins(value: i64) -> String {
    if value == UNSAMPLED {
        return "-".to_string();
    }
    let v = value as f64;
    if value.abs() >= 1_000_000_000 {
        format!("{:.2}B", v / 1_000_000_000.0)
    } else if value.abs() >= 1_000_000 {
        format!("{:.2}M", v / 1_000_000.0)
    } else if value.abs() >= 1_000 {
        format!("{:.1}K", v / 1_000.0)
    } else {
        format!("{}", value)
    }
}

fn format_stamp(item: &PlannedItem, kind: MarketKind) -> String {
    item.sample(kind)
        .updated
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Plain-text table of the list, widest name first column.
pub fn render_table(items: &[&PlannedItem]) -> String {
    let name_width = items
        .iter()
        .map(|i| i.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!(
        "{:<name_width$}  {:>3}  {:>9}  {:>9}  {:<16}  {:>9}  {:<16}\n",
        "Name", "Pri", "User", "AH", "AH updated", "BIN", "BIN updated"
    );
    for item in items {
        out.push_str(&format!(
            "{:<name_width$}  {:>3}  {:>9}  {:>9}  {:<16}  {:>9}  {:<16}\n",
            item.name,
            item.priority,
            format_coins(item.user_cost),
            format_coins(item.auction.cost),
            format_stamp(item, MarketKind::Auction),
            format_coins(item.bin.cost),
            format_stamp(item, MarketKind::Bin),
        ));
    }
    out
}

fn describe_change(change: &PriceChange) -> String {
    match (change.new_cost, change.direction(), change.difference()) {
        (Some(new), Some(dir), Some(diff)) => {
            let verb = match dir {
                Direction::Decreased => format!("decreased {}", format_coins(diff)).green(),
                Direction::Increased => format!("increased {}", format_coins(diff)).red(),
            };
            format!(
                "{} {}: {} -> {} ({verb})",
                change.name,
                change.kind,
                format_coins(change.old_cost),
                format_coins(new)
            )
        }
        _ => format!("{} {}: no usable data, kept old price", change.name, change.kind)
            .yellow()
            .to_string(),
    }
}

/// Interactive session over one user's list.
pub struct Shell {
    config: Config,
    items: ItemStore,
    market: SnapshotCache,
    history: Option<PriceHistory>,
    planner: Planner,
    editor: DefaultEditor,
}

impl Shell {
    pub fn new(config: Config, user_id: Option<String>) -> anyhow::Result<Option<Self>> {
        let mut editor = DefaultEditor::new()?;
        let items = ItemStore::new(&config.save_dir);
        let market = SnapshotCache::new(
            SnapshotStore::new(&config.data_dir),
            config.auction_sample,
            config.bin_sample,
        );

        let history = match PriceHistory::open(&config.data_dir.join("history.db")) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("price history unavailable: {e}");
                None
            }
        };

        let user_id = match user_id {
            Some(id) => id,
            None => match read(&mut editor, "User ID: ")? {
                Some(id) => id.trim().to_string(),
                None => return Ok(None),
            },
        };

        let list = match items.load(&user_id)? {
            Some(list) => {
                println!("{}", format!("Loaded item list for ID: {user_id}").green());
                list
            }
            None => {
                let answer = read(&mut editor, "User ID not found. Create new one? (y/n) ")?;
                if !answer.as_deref().is_some_and(is_yes) {
                    println!("{}", "No valid item list loaded".red());
                    return Ok(None);
                }
                let list = items.create(&user_id)?;
                println!("{}", format!("Created new user ID {user_id}").green());
                list
            }
        };

        Ok(Some(Shell {
            config,
            items,
            market,
            history,
            planner: Planner::new(user_id, list),
            editor,
        }))
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        println!("{}", "Type ? for a list of commands".green());

        loop {
            let Some(line) = read(&mut self.editor, "> ")? else {
                break;
            };
            if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                debug!("line not kept in editor history: {e}");
            }

            let cmd = match Command::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => {
                    if !line.trim().is_empty() {
                        println!("{}", "Unknown command, type ? for help.".yellow());
                    }
                    continue;
                }
                Err(e) => {
                    println!("{}", format!("Invalid argument for command: {e}").yellow());
                    continue;
                }
            };

            if cmd == Command::Quit {
                break;
            }
            if let Err(e) = self.dispatch(cmd) {
                println!("{}", format!("{e}").red());
            }
        }

        println!("{}", "Program exited.".green());
        Ok(())
    }

    fn dispatch(&mut self, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::Help => println!("{HELP}"),
            Command::Add => self.add()?,
            Command::Remove => self.remove()?,
            Command::Save => {
                self.items.save(&self.planner.user_id, &self.planner.items)?;
                println!("{}", "Saved.".green());
            }
            Command::UpdateAh => self.update_ah()?,
            Command::Update => self.update_prices()?,
            Command::List(key) => self.list(key),
            Command::History(name) => self.show_history(&name)?,
            Command::Total => println!(
                "Expected total: {}",
                format_coins(self.planner.total_cost()).cyan()
            ),
            Command::Quit => {}
        }
        Ok(())
    }

    fn prompt(&mut self, prompt: &str) -> anyhow::Result<String> {
        Ok(read(&mut self.editor, prompt)?.unwrap_or_default())
    }

    fn add(&mut self) -> anyhow::Result<()> {
        let name = self.prompt("Item name: ")?.trim().to_string();
        if name.is_empty() {
            println!("{}", "Item name cannot be empty.".yellow());
            return Ok(());
        }

        let priority = loop {
            let raw = self.prompt("Priority: (0-10) ")?;
            match raw.trim().parse::<i64>() {
                Ok(n) => match Priority::try_from(n) {
                    Ok(p) => break p,
                    Err(_) => println!("{}", "Number not in valid range".yellow()),
                },
                Err(_) => println!("{}", "Invalid integer".yellow()),
            }
        };

        let user_cost = loop {
            let raw = self.prompt("Estimated item cost: ")?;
            match raw.trim().parse::<i64>() {
                Ok(n) => break n,
                Err(_) => println!("{}", "Invalid integer".yellow()),
            }
        };

        let mut new = NewItem {
            name,
            priority,
            user_cost,
            sample_auction: false,
            sample_bin: false,
        };

        if self.config.market_search {
            let refresh = self.prompt("Update AH records first? (may take a while) (y/n) ")?;
            if is_yes(&refresh) {
                self.download()?;
            }
            new.sample_auction = is_yes(&self.prompt("Search AH for average price? (y/n) ")?);
            new.sample_bin = is_yes(&self.prompt("Search BIN for average price? (y/n) ")?);
        }

        let estimator = if new.sample_auction || new.sample_bin {
            let found = self.market.try_estimator();
            if found.is_none() {
                let note = "No auction snapshot loaded, adding without market prices.";
                println!("{}", note.yellow());
            }
            found
        } else {
            None
        };

        let item = self.planner.add(new, estimator).clone();
        for kind in [MarketKind::Auction, MarketKind::Bin] {
            let sample = item.sample(kind);
            if sample.is_tracked() {
                let cost = format_coins(sample.cost);
                println!("{}", format!("Got {kind} price average of {cost} coins.").green());
            }
        }
        if let Some(history) = &self.history {
            for kind in [MarketKind::Auction, MarketKind::Bin] {
                history.record(&item.name, kind, item.sample(kind))?;
            }
        }
        println!("{}", format!("Added {}", item.name).green());
        Ok(())
    }

    fn remove(&mut self) -> anyhow::Result<()> {
        let query = self.prompt("Item to remove: ")?;
        let removed = self.planner.remove(query.trim());
        if removed.is_empty() {
            println!("{}", "No item with that name found.".yellow());
        }
        for item in removed {
            println!("{}", format!("Removed {} from purchase list", item.name).green());
        }
        Ok(())
    }

    fn list(&self, key: Option<SortKey>) {
        let stamp = self
            .market
            .store()
            .last_update()
            .unwrap_or_else(|| "never".to_string());
        println!("{}", format!("Last AH data update: {stamp}").cyan());

        let items: Vec<&PlannedItem> = match key {
            Some(key) => self.planner.sorted(key),
            None => self.planner.items.iter().collect(),
        };
        print!("{}", render_table(&items));
    }

    /// Prints a warning and returns false when market search is switched off.
    fn market_enabled(&self) -> bool {
        match self.config.require_market_search() {
            Ok(()) => true,
            Err(e) => {
                println!("{}", format!("{e}").yellow());
                false
            }
        }
    }

    fn update_ah(&mut self) -> anyhow::Result<()> {
        if !self.market_enabled() {
            return Ok(());
        }
        let warning = "(This may take a while)".yellow();
        let answer = self.prompt(&format!("Really update AH data? (y/n) {warning} "))?;
        if is_yes(&answer) {
            self.download()?;
        }
        Ok(())
    }

    fn download(&mut self) -> PlannerResult<()> {
        println!("{}", "Updating AH...".green());
        let source = HttpPageSource::new(
            &self.config.base_url,
            self.config.api_key.clone(),
            Duration::from_millis(self.config.page_delay_ms),
        )?;
        let records = download_snapshot(&source)?;
        let stored = self.market.replace(records)?.records().len();
        println!("{}", format!("Stored {stored} auctions.").green());
        Ok(())
    }

    fn update_prices(&mut self) -> anyhow::Result<()> {
        if !self.market_enabled() {
            return Ok(());
        }
        let estimator = self.market.estimator()?;
        let now = Local::now();

        for kind in [MarketKind::Auction, MarketKind::Bin] {
            for change in self.planner.refresh_at(estimator, kind, now) {
                println!("{}", describe_change(&change));
                if let Some(history) = &self.history {
                    history.record_change(&change, now)?;
                }
            }
            for name in self.planner.untracked(kind) {
                println!("{}", format!("Did not update {kind} for {name}").yellow());
            }
        }
        Ok(())
    }

    fn show_history(&self, name: &str) -> anyhow::Result<()> {
        let Some(history) = &self.history else {
            println!("{}", "Price history is unavailable.".yellow());
            return Ok(());
        };
        if name.is_empty() {
            println!("{}", "Usage: history <item name>".yellow());
            return Ok(());
        }

        for kind in [MarketKind::Auction, MarketKind::Bin] {
            match history.summary(name, kind)? {
                Some(s) => println!(
                    "{kind}: {} samples, mean {}, sd {:.0}, range {}..{}, latest {} at {}",
                    s.count,
                    format_coins(s.mean.round() as i64),
                    s.std_dev,
                    format_coins(s.min),
                    format_coins(s.max),
                    format_coins(s.latest),
                    s.latest_at
                ),
                None => println!("{kind}: no recorded prices"),
            }
        }
        Ok(())
    }
}

fn is_yes(answer: &str) -> bool {
    answer.to_lowercase().contains('y')
}

/// `None` on Ctrl-D / Ctrl-C.
fn read(editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>, ReadlineError> {
    match editor.readline(prompt) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e),
    }
}
