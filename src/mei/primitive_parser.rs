use encoding_rs::{Encoding, WINDOWS_1252};
use nom::bytes::complete::take_till1;
use nom::character::complete::{char, digit1, multispace0, multispace1};
use nom::combinator::{map_res, opt};
use nom::multi::separated_list1;
use nom::sequence::preceded;
use nom::{IResult, Parser};

/// Leading number of a measure label, `"12a"` -> `12`
pub fn parse_measure_number(i: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>).parse(i)
}

/// Single identifier reference, with or without the leading `#`
pub fn parse_id_ref(i: &str) -> IResult<&str, &str> {
    preceded(opt(char('#')), take_till1(|c: char| c.is_whitespace())).parse(i)
}

/// Whitespace separated identifier references, as found in `@plist`
pub fn parse_id_refs(i: &str) -> IResult<&str, Vec<&str>> {
    preceded(multispace0, separated_list1(multispace1, parse_id_ref)).parse(i)
}

/// Measure number as handed to the spelling oracle, `None` if the label has no leading digits
pub fn measure_number(label: &str) -> Option<String> {
    parse_measure_number(label.trim())
        .ok()
        .map(|(_, number)| number.to_string())
}

/// Target of an identifier reference attribute
pub fn id_ref(value: &str) -> Option<&str> {
    parse_id_ref(value.trim()).ok().map(|(_, id)| id)
}

/// All targets of an identifier list attribute
pub fn id_refs(value: &str) -> Vec<&str> {
    parse_id_refs(value)
        .map(|(_, ids)| ids)
        .unwrap_or_default()
}

/// Materialize properly encoded String from raw file or process output
pub fn decode_text(i: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(i) {
        let (cow, had_errors) = encoding.decode_without_bom_handling(&i[bom_length..]);
        if had_errors {
            log::debug!("Malformed sequences while decoding with {}", encoding.name());
        }
        return cow.into_owned();
    }
    match std::str::from_utf8(i) {
        Ok(s) => s.to_string(),
        Err(e) => {
            log::debug!("Error UTF-8 string parsing:{e}, falling back to Windows-1252");
            let (cow, _encoding_used, _had_errors) = WINDOWS_1252.decode(i);
            cow.into_owned()
        }
    }
}
