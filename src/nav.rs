use crate::params::{Item, ParamTree, Parameter};

/// One row of the flattened view: where the item lives in the tree and how
/// deeply it is nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    pub path: Vec<usize>,
    pub indent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    Unfold,
    Fold,
    Toggle,
}

/// Selection and scrolling over the fold-aware flattening of a [`ParamTree`].
///
/// The view holds index paths rather than references, so it is only valid
/// for the tree it was last rebuilt from.
#[derive(Debug, Clone)]
pub struct Navigator {
    view: Vec<ViewEntry>,
    selection: Option<usize>,
    offset: usize,
    max_rows: usize,
}

impl Navigator {
    pub fn new(max_rows: usize) -> Self {
        Self {
            view: Vec::new(),
            selection: None,
            offset: 0,
            max_rows: max_rows.max(1),
        }
    }

    pub fn view(&self) -> &[ViewEntry] {
        &self.view
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Follow a change of display height.
    pub fn set_max_rows(&mut self, rows: usize) {
        self.max_rows = rows.max(1);
        self.scroll();
    }

    /// Start over on a freshly built (or cleared) tree.
    pub fn reset(&mut self, tree: &ParamTree) {
        self.selection = Some(0);
        self.offset = 0;
        self.rebuild(tree);
    }

    /// Recompute the flattened view, keeping the selection index but
    /// clamping it to the new length.
    pub fn rebuild(&mut self, tree: &ParamTree) {
        self.view = flatten(tree);
        self.selection = match self.view.len() {
            0 => None,
            len => Some(self.selection.unwrap_or(0).min(len - 1)),
        };
        self.scroll();
    }

    pub fn move_by(&mut self, delta: isize) {
        if self.view.is_empty() {
            return;
        }
        let last = (self.view.len() - 1) as isize;
        let current = self.selection.unwrap_or(0) as isize;
        self.selection = Some((current + delta).clamp(0, last) as usize);
        self.scroll();
    }

    pub fn move_to_start(&mut self) {
        if !self.view.is_empty() {
            self.selection = Some(0);
        }
        self.scroll();
    }

    pub fn move_to_end(&mut self) {
        if !self.view.is_empty() {
            self.selection = Some(self.view.len() - 1);
        }
        self.scroll();
    }

    pub fn selected_path(&self) -> Option<&[usize]> {
        self.selection
            .and_then(|i| self.view.get(i))
            .map(|e| e.path.as_slice())
    }

    pub fn selected<'t>(&self, tree: &'t ParamTree) -> Option<&'t Item> {
        tree.get(self.selected_path()?)
    }

    /// Change the fold state of the selected group. Returns false if the
    /// selection is not a group.
    pub fn fold(&mut self, tree: &mut ParamTree, op: Fold) -> bool {
        let Some(path) = self.selected_path().map(<[usize]>::to_vec) else {
            return false;
        };
        let Some(Item::Group(group)) = tree.get_mut(&path) else {
            return false;
        };
        group.unfolded = match op {
            Fold::Unfold => true,
            Fold::Fold => false,
            Fold::Toggle => !group.unfolded,
        };
        self.rebuild(tree);
        true
    }

    /// Step the selected parameter by `amount` steps. Returns the updated
    /// parameter, or `None` if the selection is not a parameter.
    pub fn adjust<'t>(&self, tree: &'t mut ParamTree, amount: f64) -> Option<&'t Parameter> {
        match tree.get_mut(self.selected_path()?)? {
            Item::Param(param) => {
                param.adjust(amount);
                Some(param)
            }
            Item::Group(_) => None,
        }
    }

    /// Keep the selection inside the `max_rows` window.
    fn scroll(&mut self) {
        let Some(sel) = self.selection else {
            self.offset = 0;
            return;
        };
        if sel < self.offset {
            self.offset = sel;
        }
        if sel >= self.offset + self.max_rows {
            self.offset = sel + 1 - self.max_rows;
        }
    }
}

/// Depth-first, order-preserving flattening. Top-level groups are always
/// open containers whose children start at indentation 0; nested groups
/// contribute their children only when unfolded.
pub fn flatten(tree: &ParamTree) -> Vec<ViewEntry> {
    fn append(items: &[Item], path: &mut Vec<usize>, indent: usize, out: &mut Vec<ViewEntry>) {
        for (i, item) in items.iter().enumerate() {
            path.push(i);
            out.push(ViewEntry {
                path: path.clone(),
                indent,
            });
            if let Item::Group(g) = item {
                if g.unfolded {
                    append(&g.items, path, indent + 1, out);
                }
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    let mut path = Vec::new();
    for (i, item) in tree.top.iter().enumerate() {
        path.push(i);
        match item {
            Item::Group(g) => append(&g.items, &mut path, 0, &mut out),
            Item::Param(_) => out.push(ViewEntry {
                path: path.clone(),
                indent: 0,
            }),
        }
        path.pop();
    }
    out
}
