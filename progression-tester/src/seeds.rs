use anyhow::{Result, bail};

pub const DEFAULT_SEED: u64 = 1337;

/// Resolve CLI seed tokens into a de-duplicated list, preserving order.
///
/// Accepts decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hex. An empty list falls back to [`DEFAULT_SEED`].
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let seed = parse_seed_token(token)?;
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

fn parse_seed_token(token: &str) -> Result<u64> {
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"));
    if let Some(digits) = hex
        && let Ok(value) = u64::from_str_radix(&digits.replace('_', ""), 16)
    {
        return Ok(value);
    }

    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }

    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }

    bail!("Unrecognized seed token: {token}");
}
