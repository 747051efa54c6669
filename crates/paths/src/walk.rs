use std::collections::BTreeSet;

use pjs_value::{DataIter, Value, ValueIter};

use crate::{
    matcher::{MatcherKind, PathToken},
    tree,
};

/// Один шаг пути совпадения: ключ и значение узла.
#[derive(Clone, Debug, PartialEq)]
pub struct DataNode {
    /// Ключ узла: строка для карт, целое для последовательностей, пустая
    /// строка у синтетического корня.
    pub key: Value,
    /// Значение узла.
    pub value: Value,
}

/// Путь совпадения: непустая последовательность узлов от синтетического
/// корня документа до выбранного узла.
///
/// Пути неизменяемы: добавление и усечение возвращают новые экземпляры.
/// Идентичность пути — `hash_id`, строка из отображений ключей,
/// соединённых `:`; по ней наборы совпадений устраняют дубликаты.
#[derive(Clone, Debug)]
pub struct MatchPath {
    nodes: Vec<DataNode>,
    hashes: Vec<String>,
    hash_id: String,
}

impl MatchPath {
    /// Путь из одного синтетического корневого узла (`key = ""`, значение —
    /// весь документ).
    pub(crate) fn root(doc: &Value) -> MatchPath {
        MatchPath {
            nodes: vec![DataNode {
                key: Value::Str(String::new()),
                value: doc.clone(),
            }],
            hashes: vec![String::new()],
            hash_id: String::new(),
        }
    }

    /// Новый путь с добавленным шагом (ключ, значение).
    pub(crate) fn append(&self, key: &Value, value: &Value) -> MatchPath {
        let mut nodes = self.nodes.clone();
        nodes.push(DataNode { key: key.clone(), value: value.clone() });
        let mut hashes = self.hashes.clone();
        hashes.push(key.to_string());
        let hash_id = hashes.join(":");
        MatchPath { nodes, hashes, hash_id }
    }

    /// Новый путь без последнего узла. Путь из одного корня остаётся
    /// корневым.
    pub(crate) fn trim(&self) -> MatchPath {
        let len = self.nodes.len().saturating_sub(1).max(1);
        let nodes = self.nodes[..len].to_vec();
        let hashes = self.hashes[..len].to_vec();
        let hash_id = hashes.join(":");
        MatchPath { nodes, hashes, hash_id }
    }

    /// Количество узлов; всегда не меньше одного.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True никогда: путь не бывает пустым. Оставлено для симметрии с
    /// `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Узел по индексу от корня.
    pub fn node_at(&self, index: usize) -> Option<&DataNode> {
        self.nodes.get(index)
    }

    /// Последний узел пути.
    pub fn last(&self) -> &DataNode {
        // Инвариант непустоты устанавливается конструкторами.
        &self.nodes[self.nodes.len() - 1]
    }

    /// Значение выбранного узла.
    pub fn value(&self) -> &Value {
        &self.last().value
    }

    /// Идентичность пути: отображения ключей, соединённые `:`.
    pub fn hash_id(&self) -> &str {
        &self.hash_id
    }

    pub(crate) fn nodes(&self) -> &[DataNode] {
        &self.nodes
    }
}

/// Упорядоченный набор путей совпадений одного выражения.
///
/// Пути хранятся в порядке первого появления; дубликаты по `hash_id`
/// отброшены.
#[derive(Clone, Debug, Default)]
pub struct MatchSet {
    paths: Vec<MatchPath>,
}

impl MatchSet {
    /// Набор без совпадений.
    pub fn empty() -> MatchSet {
        MatchSet { paths: vec![] }
    }

    /// True, если совпадений нет.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Количество путей в наборе.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Пути в порядке первого появления.
    pub fn iter(&self) -> impl Iterator<Item = &MatchPath> {
        self.paths.iter()
    }

    /// Объединяет наборы нескольких выражений в порядке аргументов,
    /// сохраняя дедупликацию по `hash_id`.
    pub fn concat(sets: Vec<MatchSet>) -> MatchSet {
        let mut seen = BTreeSet::new();
        let mut paths = vec![];
        for set in sets {
            for p in set.paths {
                if seen.insert(p.hash_id.clone()) {
                    paths.push(p);
                }
            }
        }
        MatchSet { paths }
    }

    /// Итератор протокола pjs-value по объединению совпавших поддеревьев,
    /// пригодный для кодировщика.
    ///
    /// `None` для пустого набора и для корневого совпадения по скалярному
    /// документу (скаляр кодируется значением, не итератором).
    pub fn to_iter(&self) -> Option<Box<dyn ValueIter>> {
        let (tree, doc) = tree::MatchTree::build(self)?;
        if !tree.children_of(doc).is_empty() {
            return Some(Box::new(tree::MatchesIter::new(tree, doc)));
        }
        // Лист на уровне документа: всё поддерево отдаёт обычный
        // сортированный итератор значения.
        let value = tree.value_of(doc).clone();
        match DataIter::sorted(&value) {
            Ok(it) => Some(Box::new(it)),
            Err(_) => None,
        }
    }
}

/// Прогоняет набор текущих путей через токены выражения слева направо.
pub(crate) fn find_matches(tokens: &[PathToken], doc: &Value) -> MatchSet {
    let mut cur = vec![MatchPath::root(doc)];
    for tok in tokens {
        let mut seen = BTreeSet::new();
        let mut next = vec![];
        for p in &cur {
            let mut found = vec![];
            let (total, matched) = step(tok, p, &mut found);
            // Исключающая инверсия: родитель выживает, только если
            // инверсный тест прошли все дети.
            if tok.key.is_exclusive() && matched < total {
                continue;
            }
            for q in found {
                if seen.insert(q.hash_id.clone()) {
                    next.push(q);
                }
            }
        }
        cur = next;
        if cur.is_empty() {
            break;
        }
    }
    MatchSet { paths: cur }
}

/// Применяет один токен к одному пути, дописывая продолжения в `out`.
///
/// Возвращает (всего детей, из них совпало) для верхнего уровня вызова —
/// это счётчики исключающего режима; рекурсивные спуски на них не влияют.
fn step(
    tok: &PathToken,
    p: &MatchPath,
    out: &mut Vec<MatchPath>,
) -> (usize, usize) {
    if tok.key.kind() == MatcherKind::Parent {
        out.push(p.trim());
        return (0, 0);
    }

    // Скалярные узлы обходить нечем: молча пропускаем.
    let Ok(mut it) = DataIter::new(p.value()) else { return (0, 0) };

    let mut total = 0;
    let mut matched = 0;
    while it.next() {
        let Some(entry) = it.current() else { break };
        total += 1;
        if tok.matches(&entry.key, &entry.value) {
            matched += 1;
            let next = p.append(&entry.key, &entry.value);
            if tok.key.is_recursive()
                && tok.key.is_inverse()
                && entry.value.is_container()
            {
                // Рекурсивная инверсия спускается сквозь совпавшие
                // контейнеры вместо того, чтобы выдавать их.
                step(tok, &next, out);
            } else if out
                .last()
                .is_none_or(|last| last.hash_id() != next.hash_id())
            {
                out.push(next);
            }
        } else if tok.key.is_recursive() && !tok.key.is_inverse() {
            step(tok, &p.append(&entry.key, &entry.value), out);
        }
    }
    (total, matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathExpr;

    fn mock_map() -> Value {
        serde_json::json!({
            "name": "Bob",
            "age": 30,
            "address": {
                "street": "1 Infinite Loop",
                "city": "Cupertino",
                "zip": "91234",
                "pos": ["Apple", "HQ"],
            },
            "roles": ["eng", "employee"],
        })
        .into()
    }

    fn keys_of(set: &MatchSet) -> Vec<String> {
        set.iter().map(|p| p.last().key.to_string()).collect()
    }

    fn match_keys(path: &str, doc: &Value) -> Vec<String> {
        keys_of(&PathExpr::new(path).unwrap().matches(doc))
    }

    #[test]
    fn literal_key() {
        let doc = mock_map();
        assert!(PathExpr::new("age").unwrap().is_match(&doc));
        assert!(!PathExpr::new("foo").unwrap().is_match(&doc));
        assert_eq!(vec!["age"], match_keys("age", &doc));
    }

    #[test]
    fn wildcard_key_orders_first_seen() {
        let doc = mock_map();
        // Незасортированный итератор карты отдаёт ключи в порядке
        // хранения.
        assert_eq!(
            vec!["address", "age", "name", "roles"],
            match_keys("*", &doc),
        );
    }

    #[test]
    fn alternation_under_wildcard() {
        let doc = mock_map();
        assert_eq!(vec!["city", "zip"], match_keys("*/zip|city", &doc));
    }

    #[test]
    fn parent_dedupes() {
        let doc = mock_map();
        assert_eq!(vec!["address"], match_keys("*/zip|city/..", &doc));
        // Родитель родителя — и подъём не опустошает корневой путь.
        assert_eq!(vec![""], match_keys("*/zip|city/../..", &doc));
        assert_eq!(vec![""], match_keys("*/zip|city/../../..", &doc));
    }

    #[test]
    fn parent_after_wildcards() {
        let doc = mock_map();
        assert_eq!(vec!["address", "roles"], match_keys("*/*/..", &doc));
    }

    #[test]
    fn parent_of_value_match() {
        let doc = mock_map();
        assert_eq!(
            vec!["address"],
            match_keys("*/pos/*=Apple/../..", &doc),
        );
    }

    #[test]
    fn recursive_value_descends() {
        let doc = mock_map();
        let set = PathExpr::new("address/**=Apple/..").unwrap().matches(&doc);
        assert_eq!(1, set.len());
        let p = set.iter().next().unwrap();
        let keys: Vec<String> =
            (0..p.len()).map(|i| p.node_at(i).unwrap().key.to_string()).collect();
        assert_eq!(vec!["", "address", "pos"], keys);
    }

    #[test]
    fn recursive_from_root() {
        let doc = mock_map();
        assert_eq!(vec!["pos"], match_keys("**=Apple/..", &doc));
    }

    #[test]
    fn range_selects_indices() {
        let doc: Value = serde_json::json!({"xs": [10, 20, 30, 40]}).into();
        let set = PathExpr::new("xs/1..2").unwrap().matches(&doc);
        assert_eq!(2, set.len());
        let last: Vec<(Value, Value)> = set
            .iter()
            .map(|p| (p.last().key.clone(), p.last().value.clone()))
            .collect();
        assert_eq!(
            vec![
                (Value::Int(1), Value::Int(20)),
                (Value::Int(2), Value::Int(30)),
            ],
            last,
        );
    }

    #[test]
    fn recursive_idempotent() {
        let doc = mock_map();
        assert_eq!(
            match_keys("address/**=Apple/..", &doc),
            match_keys("address/**/**=Apple/..", &doc),
        );
    }

    #[test]
    fn inverse_partitions_children() {
        let doc = mock_map();
        let plain = match_keys("a*", &doc);
        let inverted = match_keys("^a*", &doc);
        assert_eq!(vec!["address", "age"], plain);
        assert_eq!(vec!["name", "roles"], inverted);
        // Объединение — все дети, пересечение пусто.
        let mut all = plain;
        all.extend(inverted);
        all.sort();
        assert_eq!(vec!["address", "age", "name", "roles"], all);
    }

    #[test]
    fn exclusive_inverse_prunes_parent() {
        let doc = mock_map();
        // В address есть ключ pos: родитель отбрасывается целиком.
        assert!(PathExpr::new("address/^pos/..").unwrap().matches(&doc).is_empty());
        // Ни один ребёнок не называется nothing: родитель выживает.
        assert_eq!(
            vec!["address"],
            match_keys("address/^nothing/..", &doc),
        );
    }

    #[test]
    fn scalar_children_are_skipped() {
        let doc = mock_map();
        assert!(PathExpr::new("age/anything").unwrap().matches(&doc).is_empty());
    }

    #[test]
    fn scalar_document_matches_nothing() {
        let doc = Value::Int(42);
        assert!(PathExpr::new("*").unwrap().matches(&doc).is_empty());
    }

    #[test]
    fn concat_preserves_order_and_dedupes() {
        let doc = mock_map();
        let a = PathExpr::new("age").unwrap().matches(&doc);
        let b = PathExpr::new("a*").unwrap().matches(&doc);
        let merged = MatchSet::concat(vec![a, b]);
        assert_eq!(vec!["age", "address"], keys_of(&merged));
    }

    #[test]
    fn hash_ids_join_keys() {
        let doc = mock_map();
        let set = PathExpr::new("address/city").unwrap().matches(&doc);
        assert_eq!(":address:city", set.iter().next().unwrap().hash_id());
    }
}
