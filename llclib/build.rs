use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    // Generated here rather than with a const fn, as evaluating it in MIR hits the const_eval_limit.
    // It also means the table isn't recalculated on every compile
    let out_dir = std::env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?;
    let path = Path::new(&out_dir).join("hex.rs");
    let lookup_table = format!("{:?}", generate_hex_pair_table());
    std::fs::write(
        &path,
        format!("pub const HEX_LOOKUP: [[u8; u8::MAX as usize + 1]; u8::MAX as usize + 1] = {lookup_table};"),
    )?;
    Ok(())
}

/// Maps every pair of ASCII bytes to the byte the two hex digits encode, e.g. (b'3', b'f') to 0x3f
fn generate_hex_pair_table() -> Vec<Vec<u8>> {
    (0..=u8::MAX)
        .map(|high| {
            (0..=u8::MAX)
                .map(|low| hex_digit(high) << 4 | hex_digit(low))
                .collect()
        })
        .collect()
}

/// Non-hex bytes map to zero: the parser trades validation for speed
fn hex_digit(input: u8) -> u8 {
    match input {
        b'0'..=b'9' => input - b'0',
        b'A'..=b'F' => input - b'A' + 10,
        b'a'..=b'f' => input - b'a' + 10,
        _ => 0,
    }
}
