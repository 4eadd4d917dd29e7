//! Per-item fields that feed_rs does not keep as written in the document.
//!
//! feed_rs drops `<pubDate>` text it cannot parse and folds `<enclosure>` into
//! its generic media list. This module reads both straight from the XML, one
//! [`ItemExtras`] per `<item>`/`<entry>` in document order, so callers can pair
//! them with parsed entries by position.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::models::Enclosure;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemExtras {
    pub pub_date: Option<String>,
    pub enclosure: Option<Enclosure>,
}

fn is_item(local_name: &[u8]) -> bool {
    local_name == b"item" || local_name == b"entry"
}

/// Scan a feed document for every item's raw `pubDate` and first enclosure.
pub fn scan_item_extras(xml_bytes: &[u8]) -> Result<Vec<ItemExtras>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml_bytes);
    let mut buf = Vec::new();

    let mut items = Vec::new();
    let mut current: Option<ItemExtras> = None;
    // Open elements below the current item
    let mut depth = 0usize;
    let mut pub_date_text: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match current.as_mut() {
                Some(item) => {
                    depth += 1;
                    if depth == 1 {
                        match e.local_name().as_ref() {
                            b"pubDate" => pub_date_text = Some(String::new()),
                            b"enclosure" => record_enclosure(item, &e),
                            _ => {}
                        }
                    }
                }
                None if is_item(e.local_name().as_ref()) => {
                    current = Some(ItemExtras::default());
                    depth = 0;
                }
                None => {}
            },
            Event::Empty(e) => match current.as_mut() {
                Some(item) if depth == 0 && e.local_name().as_ref() == b"enclosure" => {
                    record_enclosure(item, &e);
                }
                None if is_item(e.local_name().as_ref()) => items.push(ItemExtras::default()),
                _ => {}
            },
            Event::Text(t) => {
                if let Some(text) = pub_date_text.as_mut() {
                    let decoded = t
                        .unescape()
                        .map(Cow::into_owned)
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    text.push_str(&decoded);
                }
            }
            Event::CData(c) => {
                if let Some(text) = pub_date_text.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) if current.is_some() => {
                if depth == 0 {
                    items.extend(current.take());
                } else {
                    if depth == 1 {
                        if let (Some(text), Some(item)) = (pub_date_text.take(), current.as_mut()) {
                            let text = text.trim();
                            if item.pub_date.is_none() && !text.is_empty() {
                                item.pub_date = Some(text.to_string());
                            }
                        }
                    }
                    depth -= 1;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

fn record_enclosure(item: &mut ItemExtras, element: &BytesStart<'_>) {
    if item.enclosure.is_some() {
        return;
    }

    let mut enclosure = Enclosure::default();
    for attr in element.attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.trim().to_string(),
            Err(_) => continue,
        };
        match attr.key.local_name().as_ref() {
            b"url" => enclosure.url = Some(value),
            b"type" => enclosure.media_type = Some(value),
            _ => {}
        }
    }

    if enclosure.url.is_some() {
        item.enclosure = Some(enclosure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <rss version="2.0"><channel><title>T</title><link>https://e.example</link>
            <description>d</description>{}</channel></rss>"#,
            items
        )
    }

    fn pub_dates(extras: &[ItemExtras]) -> Vec<Option<&str>> {
        extras.iter().map(|x| x.pub_date.as_deref()).collect()
    }

    #[test]
    fn test_one_entry_per_item_in_order() {
        let xml = rss(r#"
            <item><link>https://news.example/1</link><pubDate>2024-01-02 10:15:00</pubDate></item>
            <item><link>https://news.example/2</link></item>
            <item><link>https://news.example/3</link><pubDate>Tue, 02 Jan 2024 00:00:00 GMT</pubDate></item>
        "#);

        let extras = scan_item_extras(xml.as_bytes()).unwrap();
        assert_eq!(
            pub_dates(&extras),
            vec![
                Some("2024-01-02 10:15:00"),
                None,
                Some("Tue, 02 Jan 2024 00:00:00 GMT")
            ]
        );
    }

    #[test]
    fn test_escaped_link_does_not_hide_pub_date() {
        let xml = rss(r#"
            <item><link>https://news.example/a?id=2&amp;x=1</link><pubDate>2024-01-02 10:15:00</pubDate></item>
        "#);

        let extras = scan_item_extras(xml.as_bytes()).unwrap();
        assert_eq!(pub_dates(&extras), vec![Some("2024-01-02 10:15:00")]);
    }

    #[test]
    fn test_cdata_link_and_cdata_pub_date() {
        let xml = rss(r#"
            <item><link><![CDATA[https://news.example/3]]></link><pubDate><![CDATA[2024-01-02 10:15:00]]></pubDate></item>
        "#);

        let extras = scan_item_extras(xml.as_bytes()).unwrap();
        assert_eq!(pub_dates(&extras), vec![Some("2024-01-02 10:15:00")]);
    }

    #[test]
    fn test_item_with_attributes() {
        let xml = rss(r#"
            <item xml:lang="en" rdf:about="https://news.example/4"><link>https://news.example/4</link><pubDate>2024-01-02 10:15:00</pubDate></item>
        "#);

        let extras = scan_item_extras(xml.as_bytes()).unwrap();
        assert_eq!(pub_dates(&extras), vec![Some("2024-01-02 10:15:00")]);
    }

    #[test]
    fn test_enclosure_attributes() {
        let xml = rss(r#"
            <item>
                <link>https://news.example/1</link>
                <enclosure url="https://img.example/1.jpg?w=1&amp;h=2" type="image/jpeg" length="100"/>
                <enclosure url="https://img.example/second.jpg"/>
            </item>
            <item><link>https://news.example/2</link><enclosure length="1"/></item>
        "#);

        let extras = scan_item_extras(xml.as_bytes()).unwrap();
        assert_eq!(extras.len(), 2);

        let enclosure = extras[0].enclosure.as_ref().unwrap();
        assert_eq!(
            enclosure.url.as_deref(),
            Some("https://img.example/1.jpg?w=1&h=2")
        );
        assert_eq!(enclosure.media_type.as_deref(), Some("image/jpeg"));
        assert_eq!(extras[1].enclosure, None);
    }

    #[test]
    fn test_nested_pub_date_is_ignored() {
        let xml = rss(r#"
            <item><link>https://news.example/1</link><source><pubDate>2020-01-01</pubDate></source></item>
        "#);

        let extras = scan_item_extras(xml.as_bytes()).unwrap();
        assert_eq!(pub_dates(&extras), vec![None]);
    }

    #[test]
    fn test_atom_entries_are_counted() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <entry><id>1</id></entry>
            <entry><id>2</id></entry>
        </feed>"#;

        let extras = scan_item_extras(xml.as_bytes()).unwrap();
        assert_eq!(extras, vec![ItemExtras::default(), ItemExtras::default()]);
    }

    #[test]
    fn test_no_items() {
        let xml = rss("");
        assert!(scan_item_extras(xml.as_bytes()).unwrap().is_empty());
    }
}
