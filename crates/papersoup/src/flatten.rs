// ABOUTME: Path flattener: walks a section hierarchy depth-first and emits one Paragraph per leaf.
// ABOUTME: Each paragraph carries its ancestor names, a `$$`-joined path and local/global order.

use serde::{Deserialize, Serialize};

use crate::sections::{Content, Section};

/// Separator between path components.
pub const PATH_SEPARATOR: &str = "$$";

/// Stand-in for `$` inside a component so it can never form a separator.
const DOLLAR_ESCAPE: &str = "\u{FF04}";

/// One leaf of the hierarchy with its position. Fields are declared in
/// sorted order so serialized keys come out sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub ancestors: Vec<String>,
    /// Index within the enclosing section's content list.
    pub order: usize,
    /// Document-wide leaf counter.
    pub order_root: usize,
    pub path: String,
    pub text: String,
}

/// Flattens `sections` into paragraphs in reading order.
pub fn flatten_sections(sections: &[Section]) -> Vec<Paragraph> {
    let mut walker = Walker::default();
    for section in sections {
        walker.visit(section);
    }
    walker.out
}

#[derive(Default)]
struct Walker {
    ancestors: Vec<String>,
    counter: usize,
    out: Vec<Paragraph>,
}

impl Walker {
    fn visit(&mut self, section: &Section) {
        self.ancestors.push(section.name.clone());
        for (order, item) in section.content.iter().enumerate() {
            match item {
                Content::Text(text) => {
                    self.out.push(Paragraph {
                        ancestors: self.ancestors.clone(),
                        order,
                        order_root: self.counter,
                        path: join_path(&self.ancestors),
                        text: text.clone(),
                    });
                    self.counter += 1;
                }
                Content::Section(child) => self.visit(child),
            }
        }
        self.ancestors.pop();
    }
}

fn join_path(components: &[String]) -> String {
    components
        .iter()
        .map(|c| c.replace('$', DOLLAR_ESCAPE))
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}
