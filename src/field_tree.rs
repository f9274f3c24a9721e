/// A byte-keyed trie used to find the longest punctuation match at a
/// position, so that e.g. `**` is preferred over `*` when both are
/// registered and the input has two leading stars.
#[derive(Debug, Clone)]
pub struct FieldTree<T> {
    token: Option<T>,
    children: Vec<(u8, FieldTree<T>)>,
}

impl<T> FieldTree<T> {
    pub fn new() -> Self {
        Self {
            token: None,
            children: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: &[u8], token: T) -> Result<(), T> {
        if !value.is_empty() {
            match self
                .children
                .binary_search_by_key(&value[0], |child| child.0)
            {
                Ok(index) => self.children[index].1.insert(&value[1..], token),
                Err(index) => {
                    let mut field = FieldTree::new();
                    field.insert(&value[1..], token)?;
                    self.children.insert(index, (value[0], field));
                    Ok(())
                }
            }
        } else {
            match self.token.replace(token) {
                Some(t) => Err(t),
                None => Ok(()),
            }
        }
    }
}

impl<T: Clone> FieldTree<T> {
    /// Find the longest registered key that is a prefix of `code_part`,
    /// returning the associated token and the number of bytes consumed.
    pub fn find(&self, code_part: &[u8]) -> Option<(T, usize)> {
        let mut current_field = self;
        let mut index = 0;

        loop {
            if code_part.len() > index {
                match current_field
                    .children
                    .binary_search_by_key(&code_part[index], |s| s.0)
                {
                    Ok(i) => {
                        index += 1;
                        current_field = &current_field.children[i].1;
                    }
                    Err(_) => {
                        break current_field.token.as_ref().map(|t| (t.clone(), index));
                    }
                }
            } else {
                break current_field.token.as_ref().map(|t| (t.clone(), index));
            }
        }
    }
}

impl<T> Default for FieldTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_match_wins() {
        let mut tree = FieldTree::new();
        tree.insert(b"*", "star").unwrap();
        tree.insert(b"**", "double_star").unwrap();
        tree.insert(b"...", "ellipsis").unwrap();

        assert_eq!(tree.find(b"**x"), Some(("double_star", 2)));
        assert_eq!(tree.find(b"*x"), Some(("star", 1)));
        assert_eq!(tree.find(b"...x"), Some(("ellipsis", 3)));
        assert_eq!(tree.find(b"x"), None);
    }

    #[test]
    fn duplicate_insert_errors() {
        let mut tree = FieldTree::new();
        tree.insert(b"{", "open").unwrap();
        assert_eq!(tree.insert(b"{", "open2"), Err("open"));
    }
}
