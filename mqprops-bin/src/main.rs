#![deny(unsafe_code)]

use std::process;

use anyhow::{anyhow, Result};
use base64::prelude::{Engine, BASE64_STANDARD};
use bytes::{Buf, Bytes, BytesMut};
use structopt::StructOpt;

use mqprops_codec::{encode_block, PacketType, PacketTypes, Properties, PropertyId, Unpacker};
use mqprops_conf::{Options, Settings};

mod logger;

#[derive(StructOpt, Debug)]
#[structopt(name = "mqprops", about = "Encode, decode and inspect MQTT v5.0 property blocks")]
struct Args {
    #[structopt(flatten)]
    opts: Options,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Decode a length prefixed property block and print it as JSON
    Decode {
        /// Enclosing packet type, e.g. publish, connack
        #[structopt(short, long)]
        kind: PacketType,
        /// Input is base64 instead of hex
        #[structopt(long)]
        base64: bool,
        block: String,
    },
    /// Encode a JSON property set into a length prefixed property block
    Encode {
        /// Enclosing packet type, e.g. publish, connack
        #[structopt(short, long)]
        kind: PacketType,
        /// Print base64 instead of hex
        #[structopt(long)]
        base64: bool,
        json: String,
    },
    /// Print the property legality table
    Table,
}

fn main() {
    let args = Args::from_args();
    if let Err(e) = run(args) {
        eprintln!("mqprops: {e:#}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    //init config
    let settings = Settings::init(args.opts)?;

    //init log
    let _guard = logger::logger_init(&settings.log)?;

    Settings::logs();

    let out = match args.cmd {
        Command::Decode { kind, base64, block } => {
            let block = if base64 { from_base64(&block)? } else { from_hex(&block)? };
            decode(&settings.codec.unpacker(), kind, block)?
        }
        Command::Encode { kind, base64, json } => {
            let block = encode(kind, &json)?;
            if base64 {
                BASE64_STANDARD.encode(&block)
            } else {
                hex::encode(&block)
            }
        }
        Command::Table => table(),
    };
    println!("{out}");
    Ok(())
}

fn from_hex(s: &str) -> Result<Bytes> {
    let s: String = s.split_whitespace().collect();
    let s = s.strip_prefix("0x").unwrap_or(&s);
    hex::decode(s).map(Bytes::from).map_err(|e| anyhow!("invalid hex input: {e}"))
}

fn from_base64(s: &str) -> Result<Bytes> {
    BASE64_STANDARD.decode(s.trim()).map(Bytes::from).map_err(|e| anyhow!("invalid base64 input: {e}"))
}

fn decode(unpacker: &Unpacker, kind: PacketType, mut block: Bytes) -> Result<String> {
    let props = unpacker.unpack(&mut block, kind).map_err(|e| {
        anyhow!("{e} (reason code 0x{:02X})", u8::from(e.reason_code()))
    })?;
    if block.has_remaining() {
        log::warn!("{} bytes after the property block are ignored", block.remaining());
    }
    Ok(serde_json::to_string_pretty(&props)?)
}

fn encode(kind: PacketType, json: &str) -> Result<BytesMut> {
    let props: Properties = serde_json::from_str(json)?;
    for id in props.illegal_for(kind) {
        log::warn!("{} is not allowed in {} and is omitted", id.name(), kind);
    }
    let mut buf = BytesMut::new();
    encode_block(&props, kind, &mut buf)?;
    Ok(buf)
}

fn table() -> String {
    let kinds: Vec<_> = PacketTypes::WITH_PROPERTIES.packet_types().collect();
    let mut out = format!("{:<6}{:<26}{:<21}", "id", "property", "type");
    for kind in &kinds {
        out.push_str(&format!(" {:<11}", kind.name()));
    }
    for id in PropertyId::ALL {
        out.push_str(&format!("\n0x{:02X}  {:<26}{:<21}", u8::from(id), id.name(), format!("{:?}", id.wire_type())));
        for kind in &kinds {
            out.push_str(&format!(" {:<11}", if id.is_allowed_in(*kind) { "x" } else { "-" }));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use mqprops_codec::{DuplicatePolicy, Properties};

    use super::*;

    #[test]
    fn test_decode_hex_block() {
        let block = from_hex("0d 03 00 0a 74 65 78 74 2f 70 6c 61 69 6e").unwrap();
        let out = decode(&Unpacker::default(), PacketType::Publish, block).unwrap();
        let props: Properties = serde_json::from_str(&out).unwrap();
        assert_eq!(props, Properties::new().content_type("text/plain"));
    }

    #[test]
    fn test_block_input_formats() {
        assert_eq!(from_hex("0x02 23 0").unwrap_err().to_string(), "invalid hex input: Odd number of digits");
        assert!(from_hex("0g").is_err());
        assert_eq!(from_hex(" 0x00 ").unwrap(), b"\x00".as_ref());
        assert_eq!(from_base64("AyMAAQ==\n").unwrap(), b"\x03\x23\x00\x01".as_ref());
        assert!(from_base64("A*").is_err());
    }

    #[test]
    fn test_decode_errors_carry_reason_code() {
        let block = from_hex("0x03210001").unwrap();
        let err = decode(&Unpacker::default(), PacketType::Publish, block).unwrap_err();
        assert!(err.to_string().ends_with("(reason code 0x82)"), "{err}");

        let block = from_base64("BQIA").unwrap();
        let err = decode(&Unpacker::default(), PacketType::Publish, block).unwrap_err();
        assert!(err.to_string().ends_with("(reason code 0x81)"), "{err}");
    }

    #[test]
    fn test_decode_duplicates_by_policy() {
        let block = from_hex("0a02000000010200000002").unwrap();
        assert!(decode(&Unpacker::default(), PacketType::Publish, block.clone()).is_err());
        let unpacker = Unpacker::new().duplicates(DuplicatePolicy::Overwrite);
        let out = decode(&unpacker, PacketType::Publish, block).unwrap();
        assert!(out.contains("\"message_expiry\": 2"), "{out}");
    }

    #[test]
    fn test_encode_json() {
        let buf = encode(PacketType::Publish, r#"{"content_type":"text/plain","receive_maximum":10}"#).unwrap();
        assert_eq!(hex::encode(&buf), "0d03000a746578742f706c61696e");

        let buf = encode(PacketType::Connect, r#"{"user":[["k","v"]],"reason_string":"r"}"#).unwrap();
        assert_eq!(buf, b"\x07\x26\x00\x01k\x00\x01v".as_ref());

        assert!(encode(PacketType::Connect, r#"{"receive_maximum":"ten"}"#).is_err());

        // a misspelled property is an error, not an empty block
        let err = encode(PacketType::Publish, r#"{"contenttype":"text/plain"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field `contenttype`"), "{err}");
    }

    #[test]
    fn test_table() {
        let t = table();
        let lines: Vec<_> = t.lines().collect();
        assert_eq!(lines.len(), 28);
        assert!(lines[0].contains("CONNECT"));
        assert!(!lines[0].contains("PINGREQ"));
        assert!(lines[1].starts_with("0x01  payload_format"));
        assert!(lines.iter().any(|l| l.starts_with("0x26  user")));
    }
}
