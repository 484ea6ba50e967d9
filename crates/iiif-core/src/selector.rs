//! Parser for `xywh=` media-fragment selectors.
//!
//! Built on `winnow` 0.7. Accepts the forms found in IIIF annotation
//! targets:
//!
//! - `xywh=10,20,30,40` (pixels)
//! - `xywh=pixel:10,20,30,40` / `xywh=percent:5.5,0,50,50`
//! - legacy `on` strings: `https://example.org/canvas/1#xywh=10,20,30,40`

use crate::model::{Region, RegionUnit};
use winnow::ascii::space0;
use winnow::combinator::{alt, delimited, opt};
use winnow::prelude::*;
use winnow::token::take_while;

/// Parse a strict `xywh=` fragment. Returns `None` on any malformation.
pub fn parse_fragment(input: &str) -> Option<Region> {
    let mut rest = input.trim();
    let region = parse_xywh.parse_next(&mut rest).ok()?;
    if region.w < 0.0 || region.h < 0.0 {
        return None;
    }
    Some(region)
}

/// Locate and parse the `xywh=` fragment anywhere in `value`.
///
/// Never fails: a missing or malformed selector yields the zero region and
/// a warning, so one bad annotation cannot break a whole list.
pub fn parse_region(value: &str) -> Region {
    let parsed = value
        .find("xywh=")
        .and_then(|pos| parse_fragment(&value[pos..]));
    match parsed {
        Some(region) => region,
        None => {
            log::warn!("malformed region selector `{value}`, using empty region");
            Region::default()
        }
    }
}

/// Split a legacy `on` string into its target URI and fragment region.
pub fn split_target(on: &str) -> (&str, Region) {
    match on.split_once('#') {
        Some((uri, fragment)) => (uri, parse_region(fragment)),
        None => (on, parse_region(on)),
    }
}

// ─── Low-level parsers ──────────────────────────────────────────────────

fn parse_xywh(input: &mut &str) -> ModalResult<Region> {
    let _ = "xywh=".parse_next(input)?;
    let unit = parse_unit(input)?;
    let (x, _, y, _, w, _, h) = (
        parse_number,
        ',',
        parse_number,
        ',',
        parse_number,
        ',',
        parse_number,
    )
        .parse_next(input)?;
    Ok(Region { x, y, w, h, unit })
}

fn parse_unit(input: &mut &str) -> ModalResult<RegionUnit> {
    opt(alt((
        "pixel:".value(RegionUnit::Pixel),
        "percent:".value(RegionUnit::Percent),
    )))
    .map(Option::unwrap_or_default)
    .parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    delimited(
        space0,
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.' || c == '-')
            .try_map(|s: &str| s.parse::<f64>()),
        space0,
    )
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pixels() {
        assert_eq!(
            parse_fragment("xywh=10,20,30,40"),
            Some(Region::new(10.0, 20.0, 30.0, 40.0))
        );
    }

    #[test]
    fn parses_unit_prefixes_and_decimals() {
        assert_eq!(
            parse_fragment("xywh=pixel:1,2,3,4"),
            Some(Region::new(1.0, 2.0, 3.0, 4.0))
        );
        let pct = parse_fragment("xywh=percent:5.5, 0, 50, 50").unwrap();
        assert_eq!(pct.unit, RegionUnit::Percent);
        assert_eq!(pct.x, 5.5);
        assert_eq!(pct.w, 50.0);
    }

    #[test]
    fn rejects_malformed_fragments() {
        assert_eq!(parse_fragment("xywh=10,20,30"), None);
        assert_eq!(parse_fragment("xywh=a,b,c,d"), None);
        assert_eq!(parse_fragment("xywh=0,0,-5,10"), None);
        assert_eq!(parse_fragment("10,20,30,40"), None);
    }

    #[test]
    fn malformed_region_degrades_to_zero() {
        assert_eq!(parse_region("xywh=oops"), Region::default());
        assert_eq!(parse_region(""), Region::default());
    }

    #[test]
    fn legacy_on_string_splits_uri_and_region() {
        let (uri, region) = split_target("https://example.org/canvas/1#xywh=10,20,30,40");
        assert_eq!(uri, "https://example.org/canvas/1");
        assert_eq!(region, Region::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn fragment_roundtrips_through_formatter() {
        let region = Region::new(12.0, 0.0, 640.0, 480.0);
        assert_eq!(parse_fragment(&region.to_fragment()), Some(region));
    }
}
