//! Rendu d'une description en flux de morceaux XML.

use std::iter::Peekable;

use anyhow::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::warn;
use xmltree::{Element, XMLNode};

use super::{DescType, Describe, DescribeBox, ItemEnumerator};

/// Taille à partir de laquelle un morceau est rendu à l'appelant
const CHUNK_SIZE: usize = 512;

enum Frame<'a> {
    Node {
        item: DescribeBox<'a>,
        desc_type: DescType,
        next_list: usize,
        open: Vec<String>,
    },
    List {
        name: &'static str,
        items: Peekable<ItemEnumerator<'a>>,
    },
}

/// Flux XML d'une description, produit à la demande.
///
/// Le document est émis dans l'ordre : en-tête, champs du nœud décrit, puis
/// chaque liste non vide du nœud dont chaque élément est décrit récursivement
/// (fragment `Embedded`). Les listes vides ne produisent aucune balise.
///
/// La pile interne ne contient qu'un cadre par niveau de l'arbre en cours de
/// rendu : la mémoire consommée dépend de la profondeur, pas du nombre de
/// nœuds. Un flux n'est pas réutilisable ; on en crée un par réponse.
pub struct DescriptionStream<'a> {
    writer: Writer<Vec<u8>>,
    stack: Vec<Frame<'a>>,
    pending: Option<DescribeBox<'a>>,
    finished: bool,
    max_depth: usize,
}

impl<'a> DescriptionStream<'a> {
    pub fn new(item: impl Describe<'a> + 'a) -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
            stack: Vec::new(),
            pending: Some(Box::new(item)),
            finished: false,
            max_depth: 0,
        }
    }

    /// Profondeur courante de la pile de rendu
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Profondeur maximale atteinte depuis le début du rendu
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Rend tout le document dans une seule chaîne
    pub fn into_string(self) -> String {
        self.collect()
    }

    fn push(&mut self, frame: Frame<'a>) {
        self.stack.push(frame);
        self.max_depth = self.max_depth.max(self.stack.len());
    }

    fn start(&mut self, item: DescribeBox<'a>) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut open = Vec::new();
        for desc_type in [DescType::Header, DescType::Content] {
            if let Some(elem) = item.description(desc_type) {
                open.push(write_open(&mut self.writer, &elem)?);
            }
        }

        self.push(Frame::Node {
            item,
            desc_type: DescType::Content,
            next_list: 0,
            open,
        });
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        let Some(frame) = self.stack.last_mut() else {
            return Ok(());
        };

        match frame {
            Frame::Node {
                item,
                desc_type,
                next_list,
                open,
            } => match item.list(*desc_type, *next_list) {
                Some(list) => {
                    *next_list += 1;
                    let mut items = list.items.peekable();
                    if items.peek().is_some() {
                        self.writer
                            .write_event(Event::Start(BytesStart::new(list.name)))?;
                        self.push(Frame::List {
                            name: list.name,
                            items,
                        });
                    }
                }
                None => {
                    let open = std::mem::take(open);
                    self.stack.pop();
                    for name in open.iter().rev() {
                        self.writer
                            .write_event(Event::End(BytesEnd::new(name.as_str())))?;
                    }
                }
            },
            Frame::List { name, items } => match items.next() {
                Some(child) => {
                    let mut open = Vec::new();
                    if let Some(elem) = child.description(DescType::Embedded) {
                        open.push(write_open(&mut self.writer, &elem)?);
                    }
                    self.push(Frame::Node {
                        item: child,
                        desc_type: DescType::Embedded,
                        next_list: 0,
                        open,
                    });
                }
                None => {
                    let name = *name;
                    self.stack.pop();
                    self.writer.write_event(Event::End(BytesEnd::new(name)))?;
                }
            },
        }
        Ok(())
    }

    fn abort(&mut self, error: anyhow::Error) {
        warn!("❌ Description rendering aborted: {}", error);
        self.stack.clear();
        self.finished = true;
    }
}

impl Iterator for DescriptionStream<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        if let Some(item) = self.pending.take() {
            if let Err(e) = self.start(item) {
                self.abort(e);
            }
        }

        while !self.finished && self.writer.get_ref().len() < CHUNK_SIZE {
            if self.stack.is_empty() {
                self.finished = true;
                break;
            }
            if let Err(e) = self.step() {
                self.abort(e);
            }
        }

        let chunk = std::mem::take(self.writer.get_mut());
        if chunk.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&chunk).into_owned())
        }
    }
}

fn qualified_name(elem: &Element) -> String {
    match &elem.prefix {
        Some(prefix) => format!("{}:{}", prefix, elem.name),
        None => elem.name.clone(),
    }
}

fn start_tag(elem: &Element, name: &str) -> BytesStart<'static> {
    let mut start = BytesStart::new(name.to_string());
    for (key, value) in elem.attributes.iter() {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

/// Écrit la balise ouvrante et les enfants de `elem`, retourne le nom à refermer
fn write_open(writer: &mut Writer<Vec<u8>>, elem: &Element) -> Result<String> {
    let name = qualified_name(elem);
    writer.write_event(Event::Start(start_tag(elem, &name)))?;
    for child in &elem.children {
        write_node(writer, child)?;
    }
    Ok(name)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XMLNode) -> Result<()> {
    match node {
        XMLNode::Element(elem) => {
            let name = qualified_name(elem);
            if elem.children.is_empty() {
                writer.write_event(Event::Empty(start_tag(elem, &name)))?;
            } else {
                writer.write_event(Event::Start(start_tag(elem, &name)))?;
                for child in &elem.children {
                    write_node(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
        }
        XMLNode::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        _ => {}
    }
    Ok(())
}
