use anyhow::Result;
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};
use taskchain_core::devnet::DevWallet;
use taskchain_core::{AppConfig, ContractDescriptor};

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Short")]
    short: String,
    #[tabled(rename = "Selected")]
    selected: String,
}

pub fn show_accounts(config: &AppConfig, wallet: &DevWallet) {
    let selected = wallet.selected_account();
    let rows: Vec<AccountRow> = wallet
        .accounts()
        .iter()
        .enumerate()
        .map(|(index, account)| AccountRow {
            index,
            address: account.to_string(),
            short: account.short(),
            selected: if Some(account) == selected { "*".to_string() } else { String::new() },
        })
        .collect();

    println!(
        "Network: {} (chain id {})",
        config.network.name, config.network.chain_id
    );
    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    println!("{}", table);
}

pub fn show_abi(descriptor: &ContractDescriptor) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&descriptor.abi_json())?);
    Ok(())
}
