use crate::common::error::{MaloneyError, Result};
use crate::id3::specs::{self, Encoding};

/// Text information frames writable through the edit engine (ID3v2.3 and
/// ID3v2.4, including the v2.3-only date frames merged on upgrade).
const TEXT_FRAME_IDS: &[&str] = &[
    "TALB", "TBPM", "TCMP", "TCOM", "TCON", "TCOP", "TDAT", "TDEN", "TDLY", "TDOR", "TDRC",
    "TDRL", "TDTG", "TENC", "TEXT", "TFLT", "TIME", "TIPL", "TIT1", "TIT2", "TIT3", "TKEY",
    "TLAN", "TLEN", "TMCL", "TMED", "TMOO", "TOAL", "TOFN", "TOLY", "TOPE", "TORY", "TOWN",
    "TPE1", "TPE2",
    "TPE3", "TPE4", "TPOS", "TPRO", "TPUB", "TRCK", "TRDA", "TRSN", "TRSO", "TSIZ", "TSO2",
    "TSOA", "TSOC", "TSOP", "TSOT", "TSRC", "TSSE", "TSST", "TYER",
];

const URL_FRAME_IDS: &[&str] = &[
    "WCOM", "WCOP", "WOAF", "WOAR", "WOAS", "WORS", "WPAY", "WPUB",
];

/// The frame kinds the edit engine knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Url,
    Popularimeter,
    Comment,
    UserText,
}

impl FrameKind {
    /// Look up the kind of a frame id. Ids outside the registry are rejected.
    pub fn of(id: &str) -> Result<FrameKind> {
        match id {
            "POPM" => Ok(FrameKind::Popularimeter),
            "COMM" => Ok(FrameKind::Comment),
            "TXXX" => Ok(FrameKind::UserText),
            _ if URL_FRAME_IDS.contains(&id) => Ok(FrameKind::Url),
            _ if TEXT_FRAME_IDS.contains(&id) => Ok(FrameKind::Text),
            _ => Err(MaloneyError::UnknownFrameId(id.to_string())),
        }
    }

    /// Whether a tag may hold several frames of this kind.
    pub fn is_multi_instance(self) -> bool {
        matches!(
            self,
            FrameKind::Popularimeter | FrameKind::Comment | FrameKind::UserText
        )
    }
}

/// A parsed ID3v2 frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(TextFrame),
    Url(UrlFrame),
    Popularimeter(PopularimeterFrame),
    Comment(CommentFrame),
    UserText(UserTextFrame),
    /// Frame read from a file that is kept as raw bytes.
    Opaque(OpaqueFrame),
}

impl Frame {
    pub fn frame_id(&self) -> &str {
        match self {
            Frame::Text(f) => &f.id,
            Frame::Url(f) => &f.id,
            Frame::Popularimeter(_) => "POPM",
            Frame::Comment(_) => "COMM",
            Frame::UserText(_) => "TXXX",
            Frame::Opaque(f) => &f.id,
        }
    }

    /// Key distinguishing instances of multi-instance frames, mirroring the
    /// `COMM:desc:lang` style keys used by tag editors.
    pub fn hash_key(&self) -> String {
        match self {
            Frame::Popularimeter(f) => format!("POPM:{}", f.email),
            Frame::Comment(f) => format!("COMM:{}:{}", f.desc, f.lang),
            Frame::UserText(f) => format!("TXXX:{}", f.desc),
            _ => self.frame_id().to_string(),
        }
    }

    /// Human-readable value, printed by `list` next to the hash key.
    pub fn pprint(&self) -> String {
        match self {
            Frame::Text(f) => f.text.join("/"),
            Frame::Url(f) => f.url.clone(),
            Frame::Popularimeter(f) => format!("{}/255 count={}", f.rating, f.count),
            Frame::Comment(f) => f.text.clone(),
            Frame::UserText(f) => f.text.join("/"),
            Frame::Opaque(f) => format!("[{} bytes]", f.data.len()),
        }
    }

    /// Serialize the frame body (without frame header) for ID3v2.4.
    pub fn write_data(&self) -> Vec<u8> {
        match self {
            Frame::Text(f) => write_text_frame(f),
            Frame::Url(f) => specs::encode_text(&f.url, Encoding::Latin1),
            Frame::Popularimeter(f) => write_popm_frame(f),
            Frame::Comment(f) => write_comment_frame(f),
            Frame::UserText(f) => write_user_text_frame(f),
            Frame::Opaque(f) => f.data.clone(),
        }
    }
}

/// Text information frame (TIT2, TALB, TRCK, TCON, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TextFrame {
    pub id: String,
    pub encoding: Encoding,
    pub text: Vec<String>,
}

/// URL link frame (WOAR, WPUB, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct UrlFrame {
    pub id: String,
    pub url: String,
}

/// Popularimeter (POPM): rating and play counter for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct PopularimeterFrame {
    pub email: String,
    pub rating: u8,
    pub count: u64,
}

/// Comment frame (COMM).
#[derive(Debug, Clone, PartialEq)]
pub struct CommentFrame {
    pub encoding: Encoding,
    pub lang: String,
    pub desc: String,
    pub text: String,
}

/// User-defined text frame (TXXX).
#[derive(Debug, Clone, PartialEq)]
pub struct UserTextFrame {
    pub encoding: Encoding,
    pub desc: String,
    pub text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueFrame {
    pub id: String,
    pub data: Vec<u8>,
}

// ---- Parsing ----

fn split_encoding<'a>(id: &str, data: &'a [u8]) -> Result<(Encoding, &'a [u8])> {
    match data.split_first() {
        Some((&b, rest)) => Ok((Encoding::from_byte(b)?, rest)),
        None => Err(MaloneyError::ID3(format!("Empty {} frame", id))),
    }
}

fn parse_text_frame(id: &str, data: &[u8]) -> Result<Frame> {
    let (encoding, rest) = split_encoding(id, data)?;
    Ok(Frame::Text(TextFrame {
        id: id.to_string(),
        encoding,
        text: specs::split_values(rest, encoding),
    }))
}

fn parse_url_frame(id: &str, data: &[u8]) -> Frame {
    let url = specs::decode_text(data, Encoding::Latin1);
    Frame::Url(UrlFrame {
        id: id.to_string(),
        url: url.trim_end_matches('\0').to_string(),
    })
}

fn parse_popm_frame(data: &[u8]) -> Frame {
    let (email, consumed) = specs::read_encoded_text(data, Encoding::Latin1);
    let rest = &data[consumed..];
    let rating = rest.first().copied().unwrap_or(0);
    let count = rest
        .iter()
        .skip(1)
        .take(8)
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    Frame::Popularimeter(PopularimeterFrame {
        email,
        rating,
        count,
    })
}

fn parse_comment_frame(data: &[u8]) -> Result<Frame> {
    if data.len() < 4 {
        return Err(MaloneyError::ID3("COMM frame too short".into()));
    }
    let encoding = Encoding::from_byte(data[0])?;
    let lang = specs::decode_text(&data[1..4], Encoding::Latin1);
    let (desc, consumed) = specs::read_encoded_text(&data[4..], encoding);
    let text = specs::decode_text(&data[4 + consumed..], encoding);

    Ok(Frame::Comment(CommentFrame {
        encoding,
        lang,
        desc,
        text: text.trim_end_matches('\0').to_string(),
    }))
}

fn parse_user_text_frame(data: &[u8]) -> Result<Frame> {
    let (encoding, rest) = split_encoding("TXXX", data)?;
    let (desc, consumed) = specs::read_encoded_text(rest, encoding);

    Ok(Frame::UserText(UserTextFrame {
        encoding,
        desc,
        text: specs::split_values(&rest[consumed..], encoding),
    }))
}

/// Parse a frame body. Ids outside the registry are kept opaque.
pub fn parse_frame(id: &str, data: &[u8]) -> Result<Frame> {
    match FrameKind::of(id) {
        Ok(FrameKind::Text) => parse_text_frame(id, data),
        Ok(FrameKind::Url) => Ok(parse_url_frame(id, data)),
        Ok(FrameKind::Popularimeter) => Ok(parse_popm_frame(data)),
        Ok(FrameKind::Comment) => parse_comment_frame(data),
        Ok(FrameKind::UserText) => parse_user_text_frame(data),
        Err(_) => Ok(Frame::Opaque(OpaqueFrame {
            id: id.to_string(),
            data: data.to_vec(),
        })),
    }
}

/// Convert a v2.2 3-char frame ID to its v2.3/v2.4 equivalent.
pub fn convert_v22_frame_id(id: &str) -> Option<&'static str> {
    let mapped = match id {
        "BUF" => "RBUF",
        "CNT" => "PCNT",
        "COM" => "COMM",
        "CRA" => "AENC",
        "ETC" => "ETCO",
        "GEO" => "GEOB",
        "IPL" => "IPLS",
        "LNK" => "LINK",
        "MCI" => "MCDI",
        "MLL" => "MLLT",
        "POP" => "POPM",
        "REV" => "RVRB",
        "SLT" => "SYLT",
        "STC" => "SYTC",
        "TAL" => "TALB",
        "TBP" => "TBPM",
        "TCM" => "TCOM",
        "TCO" => "TCON",
        "TCR" => "TCOP",
        "TDA" => "TDAT",
        "TDY" => "TDLY",
        "TEN" => "TENC",
        "TFT" => "TFLT",
        "TIM" => "TIME",
        "TKE" => "TKEY",
        "TLA" => "TLAN",
        "TLE" => "TLEN",
        "TMT" => "TMED",
        "TOA" => "TOPE",
        "TOF" => "TOFN",
        "TOL" => "TOLY",
        "TOR" => "TORY",
        "TOT" => "TOAL",
        "TP1" => "TPE1",
        "TP2" => "TPE2",
        "TP3" => "TPE3",
        "TP4" => "TPE4",
        "TPA" => "TPOS",
        "TPB" => "TPUB",
        "TRC" => "TSRC",
        "TRD" => "TRDA",
        "TRK" => "TRCK",
        "TSI" => "TSIZ",
        "TSS" => "TSSE",
        "TT1" => "TIT1",
        "TT2" => "TIT2",
        "TT3" => "TIT3",
        "TXT" => "TEXT",
        "TXX" => "TXXX",
        "TYE" => "TYER",
        "UFI" => "UFID",
        "ULT" => "USLT",
        "WAF" => "WOAF",
        "WAR" => "WOAR",
        "WAS" => "WOAS",
        "WCM" => "WCOM",
        "WCP" => "WCOP",
        "WPB" => "WPUB",
        "WXX" => "WXXX",
        _ => return None,
    };
    Some(mapped)
}

// ---- Writing ----

fn push_terminated(data: &mut Vec<u8>, text: &str, encoding: Encoding) {
    data.extend_from_slice(&specs::encode_text(text, encoding));
    data.extend(std::iter::repeat(0u8).take(encoding.terminator_len()));
}

fn push_values(data: &mut Vec<u8>, values: &[String], encoding: Encoding) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            data.extend(std::iter::repeat(0u8).take(encoding.terminator_len()));
        }
        data.extend_from_slice(&specs::encode_text(value, encoding));
    }
}

fn write_text_frame(f: &TextFrame) -> Vec<u8> {
    let mut data = vec![f.encoding as u8];
    push_values(&mut data, &f.text, f.encoding);
    data
}

fn write_user_text_frame(f: &UserTextFrame) -> Vec<u8> {
    let mut data = vec![f.encoding as u8];
    push_terminated(&mut data, &f.desc, f.encoding);
    push_values(&mut data, &f.text, f.encoding);
    data
}

fn write_comment_frame(f: &CommentFrame) -> Vec<u8> {
    let mut data = vec![f.encoding as u8];
    let lang = f.lang.as_bytes();
    if lang.len() == 3 && lang.is_ascii() {
        data.extend_from_slice(lang);
    } else {
        data.extend_from_slice(b"XXX");
    }
    push_terminated(&mut data, &f.desc, f.encoding);
    data.extend_from_slice(&specs::encode_text(&f.text, f.encoding));
    data
}

fn write_popm_frame(f: &PopularimeterFrame) -> Vec<u8> {
    let mut data = Vec::with_capacity(f.email.len() + 6);
    push_terminated(&mut data, &f.email, Encoding::Latin1);
    data.push(f.rating);

    // The counter is at least 32 bits wide and grows a byte at a time.
    if f.count > 0 {
        let bytes = f.count.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(7).min(4);
        data.extend_from_slice(&bytes[first..]);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_classifies_ids() {
        assert_eq!(FrameKind::of("TIT2").unwrap(), FrameKind::Text);
        assert_eq!(FrameKind::of("WOAR").unwrap(), FrameKind::Url);
        assert_eq!(FrameKind::of("COMM").unwrap(), FrameKind::Comment);
        assert!(FrameKind::of("POPM").unwrap().is_multi_instance());
        assert!(matches!(
            FrameKind::of("XYZW"),
            Err(MaloneyError::UnknownFrameId(id)) if id == "XYZW"
        ));
        assert!(FrameKind::of("APIC").is_err());
    }

    #[test]
    fn comment_body_layout() {
        let frame = Frame::Comment(CommentFrame {
            encoding: Encoding::Utf8,
            lang: "deu".into(),
            desc: String::new(),
            text: "Maloney ermittelt".into(),
        });
        let data = frame.write_data();
        assert_eq!(&data[..5], b"\x03deu\x00");
        assert_eq!(parse_frame("COMM", &data).unwrap(), frame);
    }

    #[test]
    fn popm_counter_is_at_least_four_bytes() {
        let frame = Frame::Popularimeter(PopularimeterFrame {
            email: "foo@bar".into(),
            rating: 128,
            count: 3,
        });
        let data = frame.write_data();
        assert_eq!(&data[..], b"foo@bar\x00\x80\x00\x00\x00\x03");
        assert_eq!(parse_frame("POPM", &data).unwrap(), frame);
    }

    #[test]
    fn text_values_are_null_separated() {
        let frame = Frame::Text(TextFrame {
            id: "TCON".into(),
            encoding: Encoding::Utf8,
            text: vec!["Book".into(), "Krimi".into()],
        });
        assert_eq!(frame.write_data(), b"\x03Book\x00Krimi");
        assert_eq!(frame.pprint(), "Book/Krimi");
    }

    #[test]
    fn unregistered_frames_stay_opaque() {
        let frame = parse_frame("APIC", b"\x00image/png\x00\x03\x00PNG").unwrap();
        assert!(matches!(&frame, Frame::Opaque(f) if f.id == "APIC"));
        assert_eq!(frame.write_data(), b"\x00image/png\x00\x03\x00PNG");
    }

    #[test]
    fn hash_keys_separate_instances() {
        let a = Frame::UserText(UserTextFrame {
            encoding: Encoding::Utf8,
            desc: "source".into(),
            text: vec!["SRF".into()],
        });
        assert_eq!(a.hash_key(), "TXXX:source");
        assert_eq!(a.frame_id(), "TXXX");
    }
}
