use std::{collections::BTreeMap, sync::Arc};

use pjs_value::{DataIter, IterEntry, Value, ValueIter, compare_values};

use crate::walk::MatchSet;

/// Дерево, построенное по объединению путей совпадений.
///
/// Каждое ребро помечено отображением ключа очередного узла пути; братья
/// хранятся в порядке первого появления. Дерево неизменяемо после
/// построения и разделяется итераторами через `Arc`.
#[derive(Debug)]
pub(crate) struct MatchTree {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Default)]
struct TreeNode {
    index: usize,
    name: String,
    key: Value,
    value: Value,
    children: Vec<usize>,
    by_name: BTreeMap<String, usize>,
}

impl MatchTree {
    /// Строит дерево по набору совпадений. Возвращает дерево и
    /// идентификатор узла документа (ребёнка синтетической вершины).
    /// `None` для пустого набора.
    pub(crate) fn build(set: &MatchSet) -> Option<(Arc<MatchTree>, usize)> {
        if set.is_empty() {
            return None;
        }
        let mut nodes = vec![TreeNode::default()];
        for path in set.iter() {
            let mut cur = 0;
            for node in path.nodes() {
                let name = node.key.to_string();
                let id = match nodes[cur].by_name.get(&name).copied() {
                    Some(id) => id,
                    None => {
                        let id = nodes.len();
                        nodes.push(TreeNode::default());
                        nodes[cur].children.push(id);
                        nodes[cur].by_name.insert(name.clone(), id);
                        id
                    }
                };
                let entry = &mut nodes[id];
                entry.index = match node.key {
                    Value::Int(i) if i >= 0 => i as usize,
                    _ => 0,
                };
                entry.name = name;
                entry.key = node.key.clone();
                entry.value = node.value.clone();
                cur = id;
            }
        }
        let doc = nodes[0].children[0];
        Some((Arc::new(MatchTree { nodes }), doc))
    }

    pub(crate) fn children_of(&self, id: usize) -> &[usize] {
        &self.nodes[id].children
    }

    pub(crate) fn value_of(&self, id: usize) -> &Value {
        &self.nodes[id].value
    }
}

/// Итератор протокола pjs-value по братьям одного узла дерева совпадений.
///
/// Всегда в сортированном режиме: ключи упорядочиваются компаратором
/// pjs-value (числовые — численно, прочие — лексикографически), поэтому
/// индексы последовательностей идут по порядку. Уровень братьев — карта,
/// если хотя бы один ключ строковый, иначе последовательность. Лист,
/// значение которого обходимо, продолжает обход сортированным итератором
/// значения: отображается всё совпавшее поддерево.
#[derive(Debug)]
pub(crate) struct MatchesIter {
    tree: Arc<MatchTree>,
    order: Vec<usize>,
    named: bool,
    pos: Option<usize>,
}

impl MatchesIter {
    pub(crate) fn new(tree: Arc<MatchTree>, node: usize) -> MatchesIter {
        let mut order = tree.children_of(node).to_vec();
        order.sort_by(|&a, &b| {
            compare_values(&tree.nodes[a].key, &tree.nodes[b].key)
        });
        let named = order
            .iter()
            .any(|&id| matches!(tree.nodes[id].key, Value::Str(_)));
        MatchesIter { tree, order, named, pos: None }
    }
}

impl ValueIter for MatchesIter {
    fn next(&mut self) -> bool {
        let pos = self.pos.map_or(0, |p| p + 1);
        self.pos = Some(pos);
        pos < self.order.len()
    }

    fn current(&self) -> Option<IterEntry> {
        let &id = self.order.get(self.pos?)?;
        let node = &self.tree.nodes[id];
        Some(IterEntry {
            index: node.index,
            name: node.name.clone(),
            key: node.key.clone(),
            value: node.value.clone(),
        })
    }

    fn child(&self) -> Option<Box<dyn ValueIter>> {
        let &id = self.order.get(self.pos?)?;
        let node = &self.tree.nodes[id];
        if !node.children.is_empty() {
            return Some(Box::new(MatchesIter::new(self.tree.clone(), id)));
        }
        match DataIter::sorted(&node.value) {
            Ok(it) => Some(Box::new(it)),
            Err(_) => None,
        }
    }

    fn has_named_keys(&self) -> bool {
        self.named
    }

    fn is_first(&self) -> bool {
        self.pos == Some(0)
    }

    fn is_last(&self) -> bool {
        !self.order.is_empty() && self.pos == Some(self.order.len() - 1)
    }
}
