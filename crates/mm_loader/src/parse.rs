//! Line-oriented directive parser. Each non-blank, non-comment line is one directive;
//! `#` starts a comment that runs to end of line.

use mm_core::{ControlUnitKind, OutputCell, RegisterName};
use mm_util::Cell;

use crate::{Error, Image};

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

fn register_named(name: &str) -> Option<RegisterName> {
    Some(match name.to_ascii_uppercase().as_str() {
        "PC" | "IP" => RegisterName::Pc,
        "IR" => RegisterName::Ir,
        "FLAGS" => RegisterName::Flags,
        "ADDR" => RegisterName::Addr,
        "R1" => RegisterName::R1,
        "R2" => RegisterName::R2,
        "S" => RegisterName::S,
        "RES" => RegisterName::Res,
        "SP" => RegisterName::Sp,
        _ => return None,
    })
}

fn control_unit_named(name: &str) -> Option<ControlUnitKind> {
    Some(match name.to_ascii_lowercase().as_str() {
        "mm0" | "mm-0" => ControlUnitKind::Mm0,
        "mm1" | "mm-1" => ControlUnitKind::Mm1,
        "mm2" | "mm-2" => ControlUnitKind::Mm2,
        "mm3" | "mm-3" => ControlUnitKind::Mm3,
        _ => return None,
    })
}

fn parse_hex(line: usize, tok: &str) -> Result<u64, Error> {
    let tok = tok.strip_prefix("0x").unwrap_or(tok);
    u64::from_str_radix(tok, 16).map_err(|_| Error::new(line, format!("not a hex value: {tok}")))
}

/// Parse `input` into an [`Image`] ready to build a `Cpu` from.
///
/// # Grammar
///
/// ```text
/// cu <mm0|mm1|mm2|mm3>        # required, selects the control-unit variant
/// word <bits>                 # optional, default 16
/// addr <bits>                 # optional, default 16
/// protect                     # optional, enables dirty-read protection
/// entry <address>             # optional, initial PC, default 0
/// mem <address> <hex>...      # writes consecutive words starting at address
/// reg <name> <hex>            # sets a register's initial value
/// out reg <name>               # declares a register as part of the result
/// out mem <address> <bits>     # declares a memory cell as part of the result
/// ```
pub fn parse(input: &str) -> Result<Image, Error> {
    let mut control_unit = None;
    let mut word_bits = 16;
    let mut address_bits = 16;
    let mut protected = false;
    let mut entry = None;
    let mut ram_image = Vec::new();
    let mut register_image = Vec::new();
    let mut output = Vec::new();

    for (zero_indexed, raw_line) in input.lines().enumerate() {
        let line = zero_indexed + 1;
        let content = strip_comment(raw_line).trim();
        if content.is_empty() {
            continue;
        }
        let mut tokens = content.split_whitespace();
        let directive = tokens.next().expect("non-empty line has at least one token");

        match directive {
            "cu" => {
                let name = tokens.next().ok_or_else(|| Error::new(line, "cu needs a variant name"))?;
                control_unit = Some(
                    control_unit_named(name).ok_or_else(|| Error::new(line, format!("unknown control unit: {name}")))?,
                );
            }
            "word" => {
                let bits = tokens.next().ok_or_else(|| Error::new(line, "word needs a bit width"))?;
                word_bits = bits.parse().map_err(|_| Error::new(line, format!("not a number: {bits}")))?;
            }
            "addr" => {
                let bits = tokens.next().ok_or_else(|| Error::new(line, "addr needs a bit width"))?;
                address_bits = bits.parse().map_err(|_| Error::new(line, format!("not a number: {bits}")))?;
            }
            "protect" => protected = true,
            "entry" => {
                let addr = tokens.next().ok_or_else(|| Error::new(line, "entry needs an address"))?;
                entry = Some(parse_hex(line, addr)?);
            }
            "mem" => {
                let addr = tokens.next().ok_or_else(|| Error::new(line, "mem needs an address"))?;
                let mut address = parse_hex(line, addr)?;
                let mut any = false;
                for tok in tokens {
                    let value = parse_hex(line, tok)?;
                    ram_image.push((address, Cell::new(word_bits, value)));
                    address += 1;
                    any = true;
                }
                if !any {
                    return Err(Error::new(line, "mem needs at least one value"));
                }
            }
            "reg" => {
                let name = tokens.next().ok_or_else(|| Error::new(line, "reg needs a register name"))?;
                let name = register_named(name).ok_or_else(|| Error::new(line, format!("unknown register: {name}")))?;
                let value = tokens.next().ok_or_else(|| Error::new(line, "reg needs a value"))?;
                let value = parse_hex(line, value)?;
                let width = if name == RegisterName::Pc || name == RegisterName::Addr || name == RegisterName::Sp {
                    address_bits
                } else {
                    word_bits
                };
                register_image.push((name, Cell::new(width, value)));
            }
            "out" => match tokens.next() {
                Some("reg") => {
                    let name = tokens.next().ok_or_else(|| Error::new(line, "out reg needs a register name"))?;
                    let name = register_named(name).ok_or_else(|| Error::new(line, format!("unknown register: {name}")))?;
                    output.push(OutputCell::Register(name));
                }
                Some("mem") => {
                    let addr = tokens.next().ok_or_else(|| Error::new(line, "out mem needs an address"))?;
                    let address = parse_hex(line, addr)?;
                    let bits = tokens
                        .next()
                        .ok_or_else(|| Error::new(line, "out mem needs a bit width"))?
                        .parse()
                        .map_err(|_| Error::new(line, "out mem's bit width must be a number"))?;
                    output.push(OutputCell::Memory { address, bits });
                }
                _ => return Err(Error::new(line, "out needs 'reg' or 'mem'")),
            },
            other => return Err(Error::new(line, format!("unknown directive: {other}"))),
        }
    }

    let control_unit = control_unit.ok_or_else(|| Error::new(0, "missing 'cu' directive"))?;
    if let Some(entry) = entry {
        register_image.push((RegisterName::Pc, Cell::new(address_bits, entry)));
    }

    Ok(Image {
        control_unit,
        address_bits,
        word_bits,
        protected,
        ram_image,
        register_image,
        output,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_the_mm2_add_scenario() {
        let source = "
            cu mm2
            mem 0 01 0008 000a
            mem 8 0003
            mem 10 0004
            out mem 8 16
        ";
        let image = parse(source).unwrap();
        assert_eq!(image.control_unit, ControlUnitKind::Mm2);
        assert_eq!(image.ram_image.len(), 5);
        assert_eq!(image.output.len(), 1);
    }

    #[test]
    fn rejects_missing_control_unit() {
        let err = parse("mem 0 01 0002 0003").unwrap_err();
        assert!(err.to_string().contains("cu"));
    }

    #[test]
    fn rejects_unknown_directive() {
        let err = parse("cu mm2\nbogus").unwrap_err();
        assert!(err.to_string().contains("unknown directive"));
    }
}
