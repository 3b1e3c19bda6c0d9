//! PAGE XML annotation store.
//!
//! Reads ground-truth PAGE files into a [`Page`] and writes generated pages
//! back. Only the elements the layout pipeline uses are handled: `Page`,
//! `TextRegion`, `TextLine`, `Coords` and `Baseline`. The region class is taken
//! from the Transkribus-style `custom="structure {type:...;}"` attribute or,
//! failing that, from the `type` attribute.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::page::{Baseline, LinePolygon, Page, RegionPolygon};
use crate::core::{LayoutError, LayoutResult};
use crate::processors::geometry::{Point, Polygon};

/// Namespace written on generated documents.
pub const PAGE_NAMESPACE: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15";

const CREATOR: &str = "htr-layout";

/// Reads a PAGE XML file.
pub fn read_page(path: &Path) -> LayoutResult<Page> {
    let content = std::fs::read_to_string(path)?;
    parse_page(&content).map_err(|e| match e {
        LayoutError::InvalidInput { message } => LayoutError::annotation(path, message),
        other => other,
    })
}

/// Parses PAGE XML content.
pub fn parse_page(content: &str) -> LayoutResult<Page> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut page = Page::default();
    let mut regions: Vec<RegionPolygon> = Vec::new();
    let mut line: Option<LinePolygon> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Page" => read_page_attributes(&e, &mut page)?,
                b"TextRegion" => regions.push(new_region(&e)?),
                b"TextLine" => {
                    line = Some(LinePolygon {
                        id: attribute(&e, b"id")?.unwrap_or_default(),
                        coords: Polygon::default(),
                        baseline: Baseline::default(),
                    })
                }
                b"Coords" => set_coords(&e, &mut regions, &mut line)?,
                b"Baseline" => set_baseline(&e, &mut line)?,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"Page" => read_page_attributes(&e, &mut page)?,
                b"TextRegion" => page.regions.push(new_region(&e)?),
                b"Coords" => set_coords(&e, &mut regions, &mut line)?,
                b"Baseline" => set_baseline(&e, &mut line)?,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"TextLine" => {
                    if let (Some(done), Some(region)) = (line.take(), regions.last_mut()) {
                        region.lines.push(done);
                    }
                }
                b"TextRegion" => {
                    if let Some(done) = regions.pop() {
                        page.regions.push(done);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(page)
}

/// Serializes a page to PAGE XML.
pub fn write_page_to_string(page: &Page) -> LayoutResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("PcGts");
    root.push_attribute(("xmlns", PAGE_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("Metadata")))?;
    writer.write_event(Event::Start(BytesStart::new("Creator")))?;
    writer.write_event(Event::Text(BytesText::new(CREATOR)))?;
    writer.write_event(Event::End(BytesEnd::new("Creator")))?;
    writer.write_event(Event::End(BytesEnd::new("Metadata")))?;

    let mut page_el = BytesStart::new("Page");
    page_el.push_attribute(("imageFilename", page.image_filename.as_str()));
    page_el.push_attribute(("imageWidth", page.image_width.to_string().as_str()));
    page_el.push_attribute(("imageHeight", page.image_height.to_string().as_str()));
    writer.write_event(Event::Start(page_el))?;

    for region in &page.regions {
        let custom = format!("structure {{type:{};}}", region.class);
        let mut region_el = BytesStart::new("TextRegion");
        region_el.push_attribute(("id", region.id.as_str()));
        region_el.push_attribute(("custom", custom.as_str()));
        writer.write_event(Event::Start(region_el))?;
        write_points(&mut writer, "Coords", &region.coords.points)?;

        for line in &region.lines {
            let mut line_el = BytesStart::new("TextLine");
            line_el.push_attribute(("id", line.id.as_str()));
            line_el.push_attribute(("custom", custom.as_str()));
            writer.write_event(Event::Start(line_el))?;
            write_points(&mut writer, "Coords", &line.coords.points)?;
            write_points(&mut writer, "Baseline", &line.baseline.points)?;
            writer.write_event(Event::End(BytesEnd::new("TextLine")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("TextRegion")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Page")))?;
    writer.write_event(Event::End(BytesEnd::new("PcGts")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| LayoutError::invalid_input(format!("generated XML is not UTF-8: {e}")))
}

/// Writes a page to `path`, creating parent folders as needed.
pub fn write_page(page: &Page, path: &Path) -> LayoutResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, write_page_to_string(page)?)?;
    Ok(())
}

/// Formats points as `x,y x,y ...` with whole-pixel coordinates.
pub fn points_to_string(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x.round() as i64, p.y.round() as i64))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses `x,y x,y ...`.
pub fn parse_points(text: &str) -> LayoutResult<Vec<Point>> {
    text.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| LayoutError::invalid_input(format!("bad point '{pair}'")))?;
            let x = x
                .parse::<f32>()
                .map_err(|_| LayoutError::invalid_input(format!("bad x in '{pair}'")))?;
            let y = y
                .parse::<f32>()
                .map_err(|_| LayoutError::invalid_input(format!("bad y in '{pair}'")))?;
            Ok(Point::new(x, y))
        })
        .collect()
}

/// Extracts `xxx` from `... structure {type:xxx;} ...`.
fn structure_type(custom: &str) -> Option<String> {
    let start = custom.find("structure")?;
    let block = &custom[start..];
    let open = block.find('{')?;
    let close = open + block[open..].find('}')?;
    block[open + 1..close]
        .split(';')
        .filter_map(|kv| kv.split_once(':'))
        .find(|(k, _)| k.trim() == "type")
        .map(|(_, v)| v.trim().to_string())
}

fn new_region(e: &BytesStart<'_>) -> LayoutResult<RegionPolygon> {
    Ok(RegionPolygon {
        id: attribute(e, b"id")?.unwrap_or_default(),
        class: region_class(e)?,
        coords: Polygon::default(),
        lines: Vec::new(),
    })
}

/// Region class: the `custom` structure type, else the `type` attribute.
fn region_class(e: &BytesStart<'_>) -> LayoutResult<String> {
    if let Some(class) = attribute(e, b"custom")?.and_then(|custom| structure_type(&custom)) {
        return Ok(class);
    }
    Ok(attribute(e, b"type")?.unwrap_or_default())
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> LayoutResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn read_page_attributes(e: &BytesStart<'_>, page: &mut Page) -> LayoutResult<()> {
    page.image_filename = attribute(e, b"imageFilename")?.unwrap_or_default();
    page.image_width = parse_dimension(attribute(e, b"imageWidth")?, "imageWidth")?;
    page.image_height = parse_dimension(attribute(e, b"imageHeight")?, "imageHeight")?;
    Ok(())
}

fn parse_dimension(value: Option<String>, name: &str) -> LayoutResult<u32> {
    let value = value.ok_or_else(|| LayoutError::invalid_input(format!("Page without {name}")))?;
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutError::invalid_input(format!("bad {name} '{value}'")))
}

fn set_coords(
    e: &BytesStart<'_>,
    regions: &mut [RegionPolygon],
    line: &mut Option<LinePolygon>,
) -> LayoutResult<()> {
    let points = parse_points(&attribute(e, b"points")?.unwrap_or_default())?;
    if let Some(line) = line.as_mut() {
        line.coords = Polygon::new(points);
    } else if let Some(region) = regions.last_mut() {
        region.coords = Polygon::new(points);
    }
    Ok(())
}

fn set_baseline(e: &BytesStart<'_>, line: &mut Option<LinePolygon>) -> LayoutResult<()> {
    if let Some(line) = line.as_mut() {
        let points = parse_points(&attribute(e, b"points")?.unwrap_or_default())?;
        line.baseline = Baseline::new(points);
    }
    Ok(())
}

fn write_points<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    points: &[Point],
) -> LayoutResult<()> {
    let text = points_to_string(points);
    let mut el = BytesStart::new(tag);
    el.push_attribute(("points", text.as_str()));
    writer.write_event(Event::Empty(el))?;
    Ok(())
}
