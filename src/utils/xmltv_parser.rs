//! Quick-XML based XMLTV parser
//!
//! Streaming parser for XMLTV guide documents. It extracts channel and
//! programme records while skipping individually malformed elements, so one
//! broken entry never takes down an otherwise usable source. Only a document
//! that is not XMLTV at all (wrong root, broken markup) fails the source.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use tracing::warn;

use crate::errors::SourceError;
use crate::models::{EpgChannel, EpgProgram};
use crate::utils::time::parse_xmltv_datetime;

/// Everything extracted from one XMLTV document
#[derive(Debug, Default)]
pub struct ParsedGuide {
    pub channels: Vec<EpgChannel>,
    pub programs: Vec<EpgProgram>,
    /// Individually malformed elements that were skipped
    pub skipped_elements: usize,
}

#[derive(Debug, Default)]
struct ChannelDraft {
    id: Option<String>,
    display_name: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default)]
struct ProgramDraft {
    channel: Option<String>,
    start: Option<String>,
    stop: Option<String>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    language: Option<String>,
    icon: Option<String>,
}

/// Parse XMLTV content using the streaming quick-xml parser
pub fn parse_xmltv(content: &str, source_name: &str) -> Result<ParsedGuide, SourceError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut guide = ParsedGuide::default();
    let mut root_seen = false;
    let mut current_channel: Option<ChannelDraft> = None;
    let mut current_program: Option<ProgramDraft> = None;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = element_name(e.name().as_ref(), source_name)?;

                if !root_seen {
                    if name != "tv" {
                        return Err(SourceError::parse(
                            source_name,
                            format!("expected tv root element, found <{name}>"),
                        ));
                    }
                    root_seen = true;
                    continue;
                }

                match name.as_str() {
                    "channel" => {
                        let attrs = parse_attributes(e);
                        current_channel = Some(ChannelDraft {
                            id: non_empty(attrs.get("id")),
                            ..Default::default()
                        });
                    }
                    "programme" => {
                        let attrs = parse_attributes(e);
                        current_program = Some(ProgramDraft {
                            channel: non_empty(attrs.get("channel")),
                            start: non_empty(attrs.get("start")),
                            stop: non_empty(attrs.get("stop")),
                            ..Default::default()
                        });
                    }
                    // icon may also appear non-self-closed
                    "icon" => {
                        let attrs = parse_attributes(e);
                        set_icon(&mut current_channel, &mut current_program, &attrs);
                    }
                    _ => {}
                }
                current_text.clear();
            }

            Ok(Event::End(ref e)) => {
                let name = element_name(e.name().as_ref(), source_name)?;

                match name.as_str() {
                    "display-name" => {
                        if let Some(channel) = current_channel.as_mut() {
                            if channel.display_name.is_none() && !current_text.trim().is_empty() {
                                channel.display_name = Some(current_text.trim().to_string());
                            }
                        }
                    }
                    "title" | "desc" | "category" | "language" => {
                        if let Some(program) = current_program.as_mut() {
                            let text = current_text.trim();
                            if !text.is_empty() {
                                let field = match name.as_str() {
                                    "title" => &mut program.title,
                                    "desc" => &mut program.description,
                                    "category" => &mut program.category,
                                    _ => &mut program.language,
                                };
                                if field.is_none() {
                                    *field = Some(text.to_string());
                                }
                            }
                        }
                    }
                    "channel" => {
                        if let Some(draft) = current_channel.take() {
                            push_channel(&mut guide, draft, source_name);
                        }
                    }
                    "programme" => {
                        if let Some(draft) = current_program.take() {
                            push_program(&mut guide, draft, source_name);
                        }
                    }
                    _ => {}
                }
                current_text.clear();
            }

            Ok(Event::Empty(ref e)) => {
                let name = element_name(e.name().as_ref(), source_name)?;

                match name.as_str() {
                    // a self-closed root is an empty but valid guide
                    "tv" if !root_seen => {
                        root_seen = true;
                    }
                    "icon" => {
                        let attrs = parse_attributes(e);
                        set_icon(&mut current_channel, &mut current_program, &attrs);
                    }
                    // self-closed channel/programme carry all their data in attributes
                    "channel" if root_seen => {
                        let attrs = parse_attributes(e);
                        let draft = ChannelDraft {
                            id: non_empty(attrs.get("id")),
                            ..Default::default()
                        };
                        push_channel(&mut guide, draft, source_name);
                    }
                    "programme" if root_seen => {
                        let attrs = parse_attributes(e);
                        let draft = ProgramDraft {
                            channel: non_empty(attrs.get("channel")),
                            start: non_empty(attrs.get("start")),
                            stop: non_empty(attrs.get("stop")),
                            ..Default::default()
                        };
                        push_program(&mut guide, draft, source_name);
                    }
                    _ => {}
                }
            }

            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| {
                    SourceError::parse(source_name, format!("invalid text content: {e}"))
                })?;
                current_text.push_str(&text);
            }

            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e).map_err(|e| {
                    SourceError::parse(source_name, format!("invalid UTF-8 in CDATA: {e}"))
                })?;
                current_text.push_str(text);
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(SourceError::parse(
                    source_name,
                    format!("XML parsing error: {e}"),
                ));
            }

            _ => {} // declarations, comments, processing instructions
        }
    }

    if !root_seen {
        return Err(SourceError::parse(source_name, "no tv root element found"));
    }

    Ok(guide)
}

fn push_channel(guide: &mut ParsedGuide, draft: ChannelDraft, source_name: &str) {
    match finish_channel(draft, source_name) {
        Some(channel) => guide.channels.push(channel),
        None => guide.skipped_elements += 1,
    }
}

fn push_program(guide: &mut ParsedGuide, draft: ProgramDraft, source_name: &str) {
    match finish_program(draft, source_name) {
        Some(program) => guide.programs.push(program),
        None => guide.skipped_elements += 1,
    }
}

fn finish_channel(draft: ChannelDraft, source_name: &str) -> Option<EpgChannel> {
    let channel_id = match draft.id {
        Some(id) => id,
        None => {
            warn!(
                "Skipping channel element without id attribute in source '{}'",
                source_name
            );
            return None;
        }
    };

    // a channel with no display-name is still addressable by its id
    let channel_name = draft.display_name.unwrap_or_else(|| channel_id.clone());

    Some(EpgChannel {
        channel_id,
        channel_name,
        channel_logo: draft.icon,
    })
}

fn finish_program(draft: ProgramDraft, source_name: &str) -> Option<EpgProgram> {
    let (channel_id, start, stop) = match (draft.channel, draft.start, draft.stop) {
        (Some(channel), Some(start), Some(stop)) => (channel, start, stop),
        _ => {
            warn!(
                "Skipping programme element without channel/start/stop attributes in source '{}'",
                source_name
            );
            return None;
        }
    };

    let start_time = match parse_xmltv_datetime(&start) {
        Some(t) => t,
        None => {
            warn!(
                "Skipping programme with unparseable start time '{}' in source '{}'",
                start, source_name
            );
            return None;
        }
    };
    let end_time = match parse_xmltv_datetime(&stop) {
        Some(t) => t,
        None => {
            warn!(
                "Skipping programme with unparseable stop time '{}' in source '{}'",
                stop, source_name
            );
            return None;
        }
    };

    Some(EpgProgram {
        channel_id,
        start,
        stop,
        start_time,
        end_time,
        title: draft.title,
        description: draft.description,
        category: draft.category,
        language: draft.language,
        icon: draft.icon,
    })
}

fn set_icon(
    current_channel: &mut Option<ChannelDraft>,
    current_program: &mut Option<ProgramDraft>,
    attrs: &HashMap<String, String>,
) {
    let src = match non_empty(attrs.get("src")) {
        Some(src) => src,
        None => return,
    };

    if let Some(channel) = current_channel.as_mut() {
        if channel.icon.is_none() {
            channel.icon = Some(src);
        }
    } else if let Some(program) = current_program.as_mut() {
        if program.icon.is_none() {
            program.icon = Some(src);
        }
    }
}

fn element_name(name: &[u8], source_name: &str) -> Result<String, SourceError> {
    std::str::from_utf8(name)
        .map(|n| n.to_string())
        .map_err(|e| SourceError::parse(source_name, format!("invalid UTF-8 in element name: {e}")))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Parse XML attributes into a HashMap
fn parse_attributes(element: &BytesStart) -> HashMap<String, String> {
    let mut attrs = HashMap::new();

    for attr in element.attributes().flatten() {
        if let (Ok(key), Ok(value)) = (
            std::str::from_utf8(attr.key.as_ref()),
            attr.unescape_value(),
        ) {
            attrs.insert(key.to_string(), value.into_owned());
        }
    }
    attrs
}
