//! 段落级替换
//!
//! 相邻的文本节点按行内元素连接成段落，词条在整段文本上匹配，
//! 替换结果写入匹配涉及的第一个文本节点，其余节点删去对应部分。

use crate::dom::{DocumentTree, NodeClassifier, NodeKind};
use crate::filter::{Filter, Word};

/// 段落内的行内元素，不打断段落
pub const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "data", "del", "dfn", "em", "font", "i", "ins",
    "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time",
    "u", "var",
];

/// 不含正文的元素，整体跳过
pub const NON_PROSE_ELEMENTS: &[&str] = &[
    "br", "hr", "script", "style", "img", "video", "audio", "canvas", "svg", "map", "object",
    "input", "textarea", "select", "option", "optgroup", "button",
];

/// 收集 `root` 下的段落，每个段落是按文档顺序排列的文本节点
pub fn prose_runs<D, C>(doc: &D, classifier: &C, root: &D::Node) -> Vec<Vec<D::Node>>
where
    D: DocumentTree,
    C: NodeClassifier<D> + ?Sized,
{
    let mut runs = Vec::new();
    let mut current = Vec::new();
    collect(doc, classifier, root, &mut current, &mut runs);
    flush(&mut current, &mut runs);
    runs
}

fn collect<D, C>(
    doc: &D,
    classifier: &C,
    node: &D::Node,
    current: &mut Vec<D::Node>,
    runs: &mut Vec<Vec<D::Node>>,
) where
    D: DocumentTree,
    C: NodeClassifier<D> + ?Sized,
{
    match doc.kind(node) {
        NodeKind::Text => {
            if !classifier.is_forbidden_node(doc, node) {
                current.push(node.clone());
            }
        }
        NodeKind::Document => {
            for child in doc.children(node) {
                collect(doc, classifier, &child, current, runs);
            }
        }
        NodeKind::Element => {
            let tag = doc.tag_name(node).unwrap_or_default();
            if NON_PROSE_ELEMENTS.contains(&tag.as_str()) || classifier.is_forbidden_node(doc, node)
            {
                flush(current, runs);
                return;
            }

            let inline = INLINE_ELEMENTS.contains(&tag.as_str());
            if !inline {
                flush(current, runs);
            }
            for child in doc.children(node) {
                collect(doc, classifier, &child, current, runs);
            }
            if !inline {
                flush(current, runs);
            }
        }
        NodeKind::Other => {}
    }
}

fn flush<N>(current: &mut Vec<N>, runs: &mut Vec<Vec<N>>) {
    if !current.is_empty() {
        runs.push(std::mem::take(current));
    }
}

/// 在一个段落上应用单个词条，返回是否修改了文本
pub fn replace_in_run<D: DocumentTree>(
    doc: &D,
    nodes: &[D::Node],
    word: &Word,
    filter: &mut Filter,
) -> bool {
    let mut modified = false;
    let mut position = 0;

    loop {
        let texts: Vec<String> = nodes
            .iter()
            .map(|node| doc.text(node).unwrap_or_default())
            .collect();
        let joined = texts.concat();
        if position > joined.len() {
            break;
        }

        let Some(found) = word.regex.find_at(&joined, position) else {
            break;
        };
        if found.start() == found.end() {
            match joined[found.end()..].chars().next() {
                Some(c) => position = found.end() + c.len_utf8(),
                None => break,
            }
            continue;
        }

        let replacement = filter.replace_text(found.as_str(), true);
        if replacement != found.as_str() {
            write_portions(doc, nodes, &texts, found.start(), found.end(), &replacement);
            modified = true;
        }
        position = found.start() + replacement.len();
    }

    modified
}

/// 第一个被匹配覆盖的节点写入替换文本，其余节点删去被覆盖的部分
fn write_portions<D: DocumentTree>(
    doc: &D,
    nodes: &[D::Node],
    texts: &[String],
    start: usize,
    end: usize,
    replacement: &str,
) {
    let mut offset = 0;
    let mut first = true;

    for (node, text) in nodes.iter().zip(texts) {
        let node_start = offset;
        let node_end = offset + text.len();
        offset = node_end;

        if text.is_empty() || node_end <= start || node_start >= end {
            continue;
        }

        let local_start = start.max(node_start) - node_start;
        let local_end = end.min(node_end) - node_start;
        let mut updated = String::with_capacity(text.len() + replacement.len());
        updated.push_str(&text[..local_start]);
        if first {
            updated.push_str(replacement);
            first = false;
        }
        updated.push_str(&text[local_end..]);
        doc.set_text(node, &updated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MatchMethod, WordConfig};
    use crate::dom::{ForbiddenNodes, HtmlDocument};
    use indexmap::IndexMap;

    fn filter(words: &[(&str, &str)]) -> Filter {
        let mut cfg = Config::default();
        cfg.words = IndexMap::new();
        for (word, sub) in words {
            cfg.words
                .insert(word.to_string(), WordConfig::new(MatchMethod::Exact, sub));
        }
        Filter::new(&cfg)
    }

    fn run_texts(doc: &HtmlDocument, run: &[markup5ever_rcdom::Handle]) -> Vec<String> {
        run.iter().filter_map(|node| doc.text(node)).collect()
    }

    #[test]
    fn test_runs_break_at_block_elements() {
        let doc = HtmlDocument::from_html(
            "<p>one <b>two</b> three</p><div>four<script>x</script>five</div>",
        )
        .unwrap();
        let runs = prose_runs(&doc, &ForbiddenNodes, &doc.root());
        let texts: Vec<Vec<String>> = runs.iter().map(|run| run_texts(&doc, run)).collect();
        assert_eq!(
            texts,
            vec![
                vec!["one ".to_string(), "two".to_string(), " three".to_string()],
                vec!["four".to_string()],
                vec!["five".to_string()],
            ]
        );
    }

    #[test]
    fn test_phrase_spanning_nodes() {
        let doc = HtmlDocument::from_html("<p>what the <b>he</b>ll is this</p>").unwrap();
        let mut filter = filter(&[("what the hell", "what on earth")]);
        let words = filter.active_words();
        let runs = prose_runs(&doc, &ForbiddenNodes, &doc.root());

        assert!(replace_in_run(&doc, &runs[0], &words[0], &mut filter));
        assert_eq!(
            run_texts(&doc, &runs[0]),
            vec!["what on earth".to_string(), String::new(), " is this".to_string()]
        );
        assert_eq!(doc.text_content(&doc.root()), "what on earth is this");
        assert_eq!(filter.counter(), 1);
    }

    #[test]
    fn test_multiple_matches_in_one_run() {
        let doc = HtmlDocument::from_html("<p>damn <i>damn</i> damn</p>").unwrap();
        let mut filter = filter(&[("damn", "dang")]);
        let words = filter.active_words();
        let runs = prose_runs(&doc, &ForbiddenNodes, &doc.root());

        assert!(replace_in_run(&doc, &runs[0], &words[0], &mut filter));
        assert_eq!(doc.text_content(&doc.root()), "dang dang dang");
        assert!(!replace_in_run(&doc, &runs[0], &words[0], &mut filter));
        assert_eq!(filter.counter(), 3);
    }
}
