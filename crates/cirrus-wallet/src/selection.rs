//! Choosing outputs by index.
//!
//! [`SelectionStrategy`] keeps the selector testable without a terminal:
//! [`PresetIndices`] takes indices supplied up front (command line,
//! automation), [`InteractiveSelection`] prints an indexed listing and reads
//! one comma-separated line. Any bad index fails the whole selection.

use std::io::{BufRead, Write};

use cirrus_core::SpendableOutput;

use crate::coin_selection::CoinSet;
use crate::error::WalletError;

/// Turns a listing of outputs into the set to spend.
pub trait SelectionStrategy {
    fn select(&mut self, outputs: &[SpendableOutput]) -> Result<CoinSet, WalletError>;
}

/// Indices fixed in advance.
#[derive(Debug, Clone)]
pub struct PresetIndices(pub Vec<usize>);

impl SelectionStrategy for PresetIndices {
    fn select(&mut self, outputs: &[SpendableOutput]) -> Result<CoinSet, WalletError> {
        pick(outputs, &self.0)
    }
}

/// Prompt on `output`, read the answer from `input`.
pub struct InteractiveSelection<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractiveSelection<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> SelectionStrategy for InteractiveSelection<R, W> {
    fn select(&mut self, outputs: &[SpendableOutput]) -> Result<CoinSet, WalletError> {
        render_outputs(outputs, &mut self.output)?;
        write!(self.output, "Indices to spend (comma-separated): ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(WalletError::InvalidSelection("no input".into()));
        }
        pick(outputs, &parse_indices(&line)?)
    }
}

/// Parse `"0, 3,7"` into indices. Blank input and non-numeric tokens are errors.
pub fn parse_indices(line: &str) -> Result<Vec<usize>, WalletError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(WalletError::InvalidSelection("no indices entered".into()));
    }
    line.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<usize>()
                .map_err(|_| WalletError::InvalidSelection(format!("'{token}' is not an index")))
        })
        .collect()
}

/// Outputs at `indices`, in the order given.
pub fn pick(outputs: &[SpendableOutput], indices: &[usize]) -> Result<CoinSet, WalletError> {
    let coins = indices
        .iter()
        .map(|&index| {
            outputs
                .get(index)
                .cloned()
                .ok_or(WalletError::IndexOutOfRange {
                    index,
                    len: outputs.len(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    CoinSet::new(coins)
}

/// One line per output: index, address, amount in coins, creation time,
/// confirmations.
pub fn render_outputs<W: Write>(outputs: &[SpendableOutput], out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>5}  {:<36}  {:>20}  {:<20}  {:>8}",
        "index", "address", "amount", "created (UTC)", "confs"
    )?;
    for (i, o) in outputs.iter().enumerate() {
        let created = o
            .created_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| o.creation_time.to_string());
        writeln!(
            out,
            "{:>5}  {:<36}  {:>20}  {:<20}  {:>8}",
            i,
            o.address,
            o.amount_coins(),
            created,
            o.confirmations
        )?;
    }
    Ok(())
}
