// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn json_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn req(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn account_cmd() -> Command {
    Command::new("account")
        .about("Manage accounts")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Add an account")
                .arg(req("name", "Account name"))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .value_parser(["bank", "cash", "credit", "savings", "investment"])
                        .help("Account type"),
                )
                .arg(opt("currency", "ISO currency code").default_value("USD"))
                .arg(opt("billing-day", "Statement closing day (credit accounts)"))
                .arg(opt("payment-day", "Payment due day (credit accounts)"))
                .arg(opt("linked", "Account that pays this card's bills")),
        )
        .subcommand(json_args(Command::new("list").about("List accounts")))
        .subcommand(
            Command::new("rm")
                .about("Remove an account")
                .arg(req("name", "Account name")),
        )
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage categories")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Add a category")
                .arg(req("name", "Category name")),
        )
        .subcommand(json_args(
            Command::new("list").about("List categories with rule and transaction counts"),
        ))
        .subcommand(
            Command::new("rm")
                .about("Remove a category no recurring rule uses")
                .arg(req("name", "Category name")),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and list transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Record a transaction (amount is unsigned)")
                .arg(req("date", "YYYY-MM-DD"))
                .arg(req("account", "Account name"))
                .arg(req("amount", "Positive amount"))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .value_parser(["income", "expense", "transfer"])
                        .help("Entry type"),
                )
                .arg(opt("category", "Category name"))
                .arg(opt("to", "Destination account for transfers"))
                .arg(opt("description", "Free text")),
        )
        .subcommand(json_args(
            Command::new("list")
                .about("List transactions")
                .arg(opt("month", "YYYY-MM"))
                .arg(opt("account", "Account name"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Maximum rows"),
                ),
        ))
}

fn rule_fields(cmd: Command) -> Command {
    cmd.arg(req("name", "Rule name"))
        .arg(req("amount", "Positive base amount"))
        .arg(
            Arg::new("type")
                .long("type")
                .required(true)
                .value_parser(["income", "expense"])
                .help("Entry type"),
        )
        .arg(
            Arg::new("frequency")
                .long("frequency")
                .required(true)
                .value_parser([
                    "daily",
                    "weekly",
                    "monthly",
                    "bimonthly",
                    "quarterly",
                    "semiannually",
                    "yearly",
                ])
                .help("Repeat frequency"),
        )
        .arg(req("start", "First possible date, YYYY-MM-DD"))
        .arg(opt("end", "Last possible date, YYYY-MM-DD"))
        .arg(opt("day-of-week", "0=Sunday .. 6=Saturday (weekly)"))
        .arg(opt("day-of-month", "1-31, clamped to short months"))
        .arg(opt("account", "Account to book completions against"))
        .arg(opt("category", "Category name"))
}

fn recurring_cmd() -> Command {
    Command::new("recurring")
        .about("Recurring payments and their monthly instances")
        .subcommand_required(true)
        .subcommand(rule_fields(Command::new("add").about("Add a recurring rule")))
        .subcommand(rule_fields(
            Command::new("edit")
                .about("Replace a rule's definition")
                .arg(req("id", "Rule id")),
        ))
        .subcommand(json_args(Command::new("list").about("List rules")))
        .subcommand(
            Command::new("rm")
                .about("Delete a rule with its instances and exceptions")
                .arg(req("id", "Rule id")),
        )
        .subcommand(
            Command::new("pause")
                .about("Deactivate a rule")
                .arg(req("id", "Rule id")),
        )
        .subcommand(
            Command::new("resume")
                .about("Reactivate a rule")
                .arg(req("id", "Rule id")),
        )
        .subcommand(
            Command::new("set-amount")
                .about("Change the base amount from a date on, dropping later overrides")
                .arg(req("id", "Rule id"))
                .arg(req("amount", "New positive amount"))
                .arg(req("from", "YYYY-MM-DD")),
        )
        .subcommand(json_args(
            Command::new("occurrences")
                .about("Preview occurrences without saving anything")
                .arg(req("id", "Rule id"))
                .arg(req("from", "YYYY-MM-DD"))
                .arg(req("to", "YYYY-MM-DD")),
        ))
        .subcommand(json_args(
            Command::new("month")
                .about("Materialize and list instances for a month")
                .arg(req("month", "YYYY-MM"))
                .arg(opt("id", "Only this rule")),
        ))
        .subcommand(
            Command::new("toggle")
                .about("Mark an instance completed or pending")
                .arg(req("id", "Instance id")),
        )
}

fn exception_cmd() -> Command {
    Command::new("exception")
        .about("One-off overrides for a single occurrence")
        .subcommand_required(true)
        .subcommand(
            Command::new("set")
                .about("Override or skip one occurrence")
                .arg(req("rule", "Rule id"))
                .arg(req("date", "Occurrence date, YYYY-MM-DD"))
                .arg(opt("amount", "Override amount"))
                .arg(opt("note", "Note"))
                .arg(
                    Arg::new("skip")
                        .long("skip")
                        .action(ArgAction::SetTrue)
                        .help("Skip this occurrence"),
                ),
        )
        .subcommand(json_args(
            Command::new("list")
                .about("List exceptions of a rule")
                .arg(req("rule", "Rule id")),
        ))
        .subcommand(
            Command::new("rm")
                .about("Remove an exception by id, or by rule and date")
                .arg(opt("id", "Exception id").conflicts_with_all(["rule", "date"]))
                .arg(opt("rule", "Rule id").requires("date"))
                .arg(opt("date", "Occurrence date").requires("rule")),
        )
}

fn bills_cmd() -> Command {
    Command::new("bills")
        .about("Credit-card statements")
        .subcommand_required(true)
        .subcommand(json_args(
            Command::new("month")
                .about("Materialize and list bills closing in a month")
                .arg(req("month", "YYYY-MM")),
        ))
        .subcommand(
            Command::new("toggle")
                .about("Mark a bill paid or unpaid")
                .arg(req("id", "Bill id")),
        )
}

fn export_cmd() -> Command {
    Command::new("export")
        .about("Export data")
        .subcommand_required(true)
        .subcommand(
            Command::new("schedule")
                .about("Export a month's instances and bills")
                .arg(req("month", "YYYY-MM"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("csv")
                        .help("csv or json"),
                )
                .arg(req("out", "Output file")),
        )
}

pub fn build_cli() -> Command {
    Command::new("ledgerloop")
        .about("Recurring payments, exceptions, and credit-card billing cycles")
        .version(crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .env("LEDGERLOOP_DB")
                .value_parser(value_parser!(std::path::PathBuf))
                .help("SQLite database file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output on stderr (repeatable)"),
        )
        .subcommand(Command::new("init").about("Create or migrate the database"))
        .subcommand(account_cmd())
        .subcommand(category_cmd())
        .subcommand(tx_cmd())
        .subcommand(recurring_cmd())
        .subcommand(exception_cmd())
        .subcommand(bills_cmd())
        .subcommand(Command::new("doctor").about("Check schedule and ledger integrity"))
        .subcommand(export_cmd())
}
