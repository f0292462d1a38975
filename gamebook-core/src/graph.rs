//! Read-only directed graph view of a story, as consumed by the map view.
//!
//! Chapters are nodes and choice targets are edges. Stories are free to loop
//! back on themselves, so traversal keeps a visited set.

use std::collections::{HashSet, VecDeque};

use crate::model::{Chapter, ChapterId, OnStartItem, RequirementDetail, Story};

#[derive(Debug, Clone)]
pub struct StoryNode<'a> {
    pub id: ChapterId,
    pub title: &'a str,
    pub is_start: bool,
    pub image: Option<&'a str>,
    pub on_start: &'a [OnStartItem],
    /// Requirements and costs on choices leading here, one per key and kind.
    pub incoming_resources: Vec<&'a RequirementDetail>,
}

#[derive(Debug, Clone)]
pub struct StoryEdge<'a> {
    pub source: ChapterId,
    pub target: ChapterId,
    pub choice: &'a str,
    pub probability: u32,
    pub requirements: Vec<&'a RequirementDetail>,
    pub costs: Vec<&'a RequirementDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub reachable_nodes: usize,
    pub unreachable_nodes: usize,
    pub dead_ends: usize,
}

#[derive(Debug, Clone)]
pub struct StoryGraph<'a> {
    story: &'a Story,
    pub nodes: Vec<StoryNode<'a>>,
    pub edges: Vec<StoryEdge<'a>>,
}

impl<'a> StoryGraph<'a> {
    #[must_use]
    pub fn from_story(story: &'a Story) -> Self {
        let mut nodes: Vec<StoryNode<'a>> = story.chapters.iter().map(node_for).collect();
        let mut edges = Vec::new();

        for chapter in &story.chapters {
            for choice in &chapter.choices {
                for target in &choice.targets {
                    edges.push(StoryEdge {
                        source: chapter.id,
                        target: target.target_id,
                        choice: choice.text.as_str(),
                        probability: target.probability,
                        requirements: choice.requirement.requirements().collect(),
                        costs: choice.requirement.costs().collect(),
                    });

                    if let Some(node) = nodes.iter_mut().find(|node| node.id == target.target_id) {
                        for detail in &choice.requirement {
                            merge_incoming(&mut node.incoming_resources, detail);
                        }
                    }
                }
            }
        }

        Self {
            story,
            nodes,
            edges,
        }
    }

    #[must_use]
    pub fn node(&self, id: ChapterId) -> Option<&StoryNode<'a>> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn outgoing(&self, id: ChapterId) -> impl Iterator<Item = &StoryEdge<'a>> {
        self.edges.iter().filter(move |edge| edge.source == id)
    }

    /// Chapters reachable from `start`, in breadth-first order.
    #[must_use]
    pub fn reachable_from(&self, start: ChapterId) -> Vec<ChapterId> {
        if self.story.chapter(start).is_none() {
            return Vec::new();
        }
        let mut visited = HashSet::from([start]);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            order.push(current);
            for edge in self.outgoing(current) {
                if self.story.chapter(edge.target).is_some() && visited.insert(edge.target) {
                    queue.push_back(edge.target);
                }
            }
        }
        order
    }

    /// Chapters no path from the start chapter reaches. Without a start
    /// chapter every chapter is unreachable.
    #[must_use]
    pub fn unreachable_chapters(&self) -> Vec<ChapterId> {
        let reachable: HashSet<ChapterId> = self
            .story
            .start_chapter()
            .map(|start| self.reachable_from(start.id).into_iter().collect())
            .unwrap_or_default();
        self.story
            .chapters
            .iter()
            .map(|chapter| chapter.id)
            .filter(|id| !reachable.contains(id))
            .collect()
    }

    /// Chapters without any choice.
    #[must_use]
    pub fn dead_ends(&self) -> Vec<ChapterId> {
        self.story
            .chapters
            .iter()
            .filter(|chapter| chapter.choices.is_empty())
            .map(|chapter| chapter.id)
            .collect()
    }

    /// Edges whose target chapter does not exist.
    pub fn missing_targets(&self) -> impl Iterator<Item = &StoryEdge<'a>> {
        self.edges
            .iter()
            .filter(|edge| self.story.chapter(edge.target).is_none())
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let unreachable = self.unreachable_chapters().len();
        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            reachable_nodes: self.nodes.len() - unreachable,
            unreachable_nodes: unreachable,
            dead_ends: self.dead_ends().len(),
        }
    }
}

fn node_for(chapter: &Chapter) -> StoryNode<'_> {
    StoryNode {
        id: chapter.id,
        title: chapter.title.as_str(),
        is_start: chapter.is_start_chapter,
        image: chapter.image.as_deref(),
        on_start: chapter.on_start.as_slice(),
        incoming_resources: Vec::new(),
    }
}

fn merge_incoming<'a>(incoming: &mut Vec<&'a RequirementDetail>, detail: &'a RequirementDetail) {
    match incoming
        .iter_mut()
        .find(|seen| seen.key == detail.key && seen.is_cost == detail.is_cost)
    {
        Some(slot) => *slot = detail,
        None => incoming.push(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Choice, Target};

    fn link(story: &mut Story, from: u32, to: &[u32]) {
        let mut choice = Choice::new(format!("{from} onwards"));
        choice.targets = to.iter().map(|&id| Target::new(ChapterId(id), 100)).collect();
        if let Some(chapter) = story.chapter_mut(ChapterId(from)) {
            chapter.choices.push(choice);
        }
    }

    fn looping_story() -> Story {
        let mut story = Story::new();
        for _ in 0..5 {
            story.add_chapter().unwrap();
        }
        story.set_start_chapter(ChapterId(1)).unwrap();
        link(&mut story, 1, &[2]);
        link(&mut story, 2, &[3, 1]);
        link(&mut story, 3, &[2]);
        link(&mut story, 5, &[4]);
        story
    }

    #[test]
    fn traversal_survives_cycles() {
        let story = looping_story();
        let graph = StoryGraph::from_story(&story);
        assert_eq!(
            graph.reachable_from(ChapterId(1)),
            vec![ChapterId(1), ChapterId(2), ChapterId(3)]
        );
        assert_eq!(graph.unreachable_chapters(), vec![ChapterId(4), ChapterId(5)]);
        assert_eq!(graph.dead_ends(), vec![ChapterId(4)]);
    }

    #[test]
    fn no_start_means_everything_unreachable() {
        let mut story = looping_story();
        story.chapters[0].is_start_chapter = false;
        let graph = StoryGraph::from_story(&story);
        assert_eq!(graph.unreachable_chapters().len(), 5);
        assert_eq!(graph.stats().reachable_nodes, 0);
    }

    #[test]
    fn edges_carry_choice_resources() {
        let mut story = looping_story();
        let choice = &mut story.chapters[0].choices[0];
        choice
            .requirement
            .insert(RequirementDetail::new("gold", 5_i64.into(), false, false));
        choice
            .requirement
            .insert(RequirementDetail::new("key", 1_i64.into(), true, true));
        link(&mut story, 3, &[9]);

        let graph = StoryGraph::from_story(&story);
        let edge = graph.outgoing(ChapterId(1)).next().unwrap();
        assert_eq!(edge.requirements.len(), 1);
        assert_eq!(edge.costs.len(), 1);
        assert_eq!(graph.node(ChapterId(2)).unwrap().incoming_resources.len(), 2);
        assert_eq!(graph.missing_targets().count(), 1);
        assert_eq!(graph.stats().total_edges, 6);
    }
}
