use std::collections::HashMap;

use super::param::Parameter;
use crate::error::Result;

/// Name of the synthetic group holding every parameter before grouping.
pub const ROOT_NAME: &str = "root";

/// A node of the parameter hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Param(Parameter),
    Group(Group),
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Param(p) => &p.name,
            Item::Group(g) => &g.name,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Item::Group(g) => Some(g),
            Item::Param(_) => None,
        }
    }

    pub fn as_param(&self) -> Option<&Parameter> {
        match self {
            Item::Param(p) => Some(p),
            Item::Group(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub items: Vec<Item>,
    pub unfolded: bool,
}

impl Group {
    fn new(name: String, items: Vec<Item>) -> Self {
        Self {
            name,
            items,
            unfolded: false,
        }
    }
}

/// The parameter hierarchy built from one `list_params` payload.
///
/// `top` holds either the single item left after grouping, or the synthetic
/// root group when there is more than one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTree {
    pub top: Vec<Item>,
}

impl ParamTree {
    /// Parse every payload line and build the tree. Any bad line aborts the build.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let params = lines
            .iter()
            .map(|l| Parameter::parse(l.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::build(params))
    }

    pub fn build(params: Vec<Parameter>) -> Self {
        let items = make_sub_groups(params);
        let top = if items.len() == 1 {
            items
        } else {
            vec![Item::Group(Group::new(ROOT_NAME.to_string(), items))]
        };
        ParamTree { top }
    }

    /// Resolve an index path (first element indexes `top`).
    pub fn get(&self, path: &[usize]) -> Option<&Item> {
        let (first, rest) = path.split_first()?;
        let mut item = self.top.get(*first)?;
        for &idx in rest {
            item = item.as_group()?.items.get(idx)?;
        }
        Some(item)
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Item> {
        let (first, rest) = path.split_first()?;
        let mut item = self.top.get_mut(*first)?;
        for &idx in rest {
            item = match item {
                Item::Group(g) => g.items.get_mut(idx)?,
                Item::Param(_) => return None,
            };
        }
        Some(item)
    }

    /// Every parameter in depth-first order, regardless of fold state.
    pub fn parameters(&self) -> Vec<&Parameter> {
        fn walk<'a>(items: &'a [Item], out: &mut Vec<&'a Parameter>) {
            for item in items {
                match item {
                    Item::Param(p) => out.push(p),
                    Item::Group(g) => walk(&g.items, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.top, &mut out);
        out
    }

    /// True once the tree has been forgotten. A successful but empty listing
    /// still has its `root` group.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Fold or unfold every group.
    #[cfg(test)]
    pub fn set_all_unfolded(&mut self, unfolded: bool) {
        fn walk(items: &mut [Item], unfolded: bool) {
            for item in items {
                if let Item::Group(g) = item {
                    g.unfolded = unfolded;
                    walk(&mut g.items, unfolded);
                }
            }
        }
        walk(&mut self.top, unfolded);
    }
}

/// Group parameters by the first segment of their dotted names, recursively.
///
/// Partitions with several members become a [`Group`] named after the shared
/// prefix, with members renamed to the remaining suffix. A single member is
/// kept as a bare item under its re-qualified name. Siblings are sorted by name.
///
/// Sibling names are unique only when the input refs are: `a` and `a.a`
/// both end up as a child named `a` of group `a`.
fn make_sub_groups(params: Vec<Parameter>) -> Vec<Item> {
    let mut order: Vec<(String, Vec<Parameter>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut param in params {
        let key = match param.name.split_once('.') {
            Some((prefix, suffix)) => {
                let prefix = prefix.to_string();
                param.name = suffix.to_string();
                prefix
            }
            None => param.name.clone(),
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push((key, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(param);
    }

    let mut items: Vec<Item> = order
        .into_iter()
        .map(|(key, mut members)| {
            if members.len() == 1 {
                let mut param = members.remove(0);
                if key != param.name {
                    param.name = format!("{key}.{}", param.name);
                }
                Item::Param(param)
            } else {
                Item::Group(Group::new(key, make_sub_groups(members)))
            }
        })
        .collect();

    items.sort_by(|a, b| a.name().cmp(b.name()));
    items
}

/// Indented dump of the hierarchy with current values, one line per item.
pub fn dump(tree: &ParamTree) -> Vec<String> {
    fn walk(items: &[Item], indent: usize, out: &mut Vec<String>) {
        for item in items {
            match item {
                Item::Param(p) => out.push(format!(
                    "{:indent$}{} = {} ({})",
                    "",
                    p.name,
                    p.display_value().trim(),
                    p.reference,
                    indent = indent * 2
                )),
                Item::Group(g) => {
                    out.push(format!("{:indent$}{}/", "", g.name, indent = indent * 2));
                    walk(&g.items, indent + 1, out);
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(&tree.top, 0, &mut out);
    out
}
