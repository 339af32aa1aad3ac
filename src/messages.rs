// Reply texts shown to desk operators.

pub const NOT_PERMITTED: &str = "This desk is not available to you.";

pub const HELP: &str = "Scan the voucher and send its code.\n\
Then send the amount to withdraw from the voucher.\n\
The amount must be a whole number (no cents).";

pub const FINISHED: &str = "Finished working with the voucher.";
pub const ALREADY_FINISHED: &str = "Work with the voucher is already finished.";
pub const BAD_AMOUNT: &str = "Check the amount!\nIt must be a whole number.";
pub const NO_VOUCHER: &str = "Scan a voucher first, then send the amount.";
pub const LEDGER_UNAVAILABLE: &str = "The ledger is unavailable right now, please try again.";
pub const INVALID_VOUCHER: &str = "This voucher code is not valid, scan it again.";
pub const BALANCE_USAGE: &str = "Usage: /balance <voucher code>";

pub fn selected(remaining: i64) -> String {
    format!("Balance: {}\nNow enter the amount (no cents) to withdraw from the voucher.", remaining)
}

pub fn balance(voucher: &str, remaining: i64) -> String {
    format!("Voucher {}: balance {}", voucher, remaining)
}

pub fn withdrawn(remaining: i64) -> String {
    format!("Withdrawn. Remaining balance: {}", remaining)
}

pub fn insufficient(shortfall: i64) -> String {
    format!(
        "Insufficient funds, {} short.\n{} must be paid on top. The funds were taken from the voucher.",
        shortfall, shortfall
    )
}

pub fn continue_or_stop(total: u32) -> String {
    format!(
        "Finish with this voucher?\nPress /stop or enter another amount to withdraw.\n\
Cash shortfall for this voucher should be: {}",
        total
    )
}
