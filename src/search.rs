use core::ops::AddAssign;

use common::pair::Pair;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{
    action::{decode, legal_action_count, Menu},
    arena::{Arena, Handle},
    parallel::StopFlag,
    policy::Policy,
    rules::{advance_state, status},
    state::{Board, PlayerState},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Children {
    Unexpanded,
    Expanded(Handle<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub choices: u16,
    pub children: Children,
    pub visits: u32,
    pub score: f32,
}

impl Node {
    pub const LEAF: Self = Self {
        choices: 0,
        children: Children::Unexpanded,
        visits: 0,
        score: 0.,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActionStats {
    pub visits: u64,
    pub score: f64,
}

impl AddAssign for ActionStats {
    fn add_assign(&mut self, rhs: Self) {
        self.visits += rhs.visits;
        self.score += rhs.score;
    }
}

impl From<&Node> for ActionStats {
    fn from(node: &Node) -> Self {
        Self {
            visits: node.visits as u64,
            score: node.score as f64,
        }
    }
}

pub struct Search<P> {
    arena: Arena<Node>,
    rng: ChaCha8Rng,
    policy: P,
    scratch: Vec<f32>,
    root: Handle<Node>,
    board: Board,
    turn: u32,
    max_turn: u32,
    rollouts: u64,
}

impl<P: Policy> Search<P> {
    pub fn new(
        board: Board,
        turn: u32,
        max_turn: u32,
        policy: P,
        mut arena: Arena<Node>,
        rng: ChaCha8Rng,
    ) -> Self {
        arena.reset();
        let root = arena.alloc(1, Node::LEAF);

        let mut search = Self {
            arena,
            rng,
            policy,
            scratch: Vec::new(),
            root,
            board,
            turn,
            max_turn,
            rollouts: 0,
        };
        search.expand(root, &board.a);
        search
    }

    pub fn rollouts(&self) -> u64 {
        self.rollouts
    }

    pub fn nodes(&self) -> usize {
        self.arena.len()
    }

    pub fn root_choices(&self) -> u16 {
        self.arena[self.root].choices
    }

    pub fn run(&mut self, stop: &StopFlag) {
        while !stop.is_set() {
            self.rollout();
        }
    }

    pub fn run_for(&mut self, rollouts: u64) {
        for _ in 0..rollouts {
            self.rollout();
        }
    }

    pub fn rollout(&mut self) -> f32 {
        let mut board = self.board;
        let reward = self.visit(self.root, &mut board, self.turn);
        self.rollouts += 1;
        reward
    }

    /// Statistics of every root action, indexed like the action menu of player A.
    pub fn root_stats(&self) -> Vec<ActionStats> {
        match self.arena[self.root].children {
            Children::Expanded(children) => self
                .arena
                .slice(children, self.root_choices() as usize)
                .iter()
                .map(ActionStats::from)
                .collect(),
            Children::Unexpanded => Vec::new(),
        }
    }

    fn expand(&mut self, node: Handle<Node>, player: &PlayerState) -> Handle<Node> {
        let choices = legal_action_count(player);
        let children = self.arena.alloc(choices as usize, Node::LEAF);
        let n = &mut self.arena[node];
        n.choices = choices;
        n.children = Children::Expanded(children);
        children
    }

    fn children(&mut self, node: Handle<Node>, player: &PlayerState) -> Handle<Node> {
        match self.arena[node].children {
            Children::Expanded(children) => children,
            Children::Unexpanded => self.expand(node, player),
        }
    }

    fn select(&mut self, children: Handle<Node>, choices: u16) -> (u16, f32) {
        let slice = self.arena.slice(children, choices as usize);
        self.policy.select(slice, &mut self.rng, &mut self.scratch)
    }

    fn visit(&mut self, node: Handle<Node>, board: &mut Board, turn: u32) -> f32 {
        let outcome = status(board, turn, self.max_turn);
        if outcome.is_terminal() {
            return outcome.reward();
        }

        let fresh = self.arena[node].children == Children::Unexpanded;
        let replies = self.children(node, &board.a);
        let count_a = self.arena[node].choices;

        if fresh {
            // The reply stays unexpanded until the tree comes back through it.
            let a = self.rng.gen_range(0..count_a);
            let count_b = legal_action_count(&board.b);
            let b = self.rng.gen_range(0..count_b);

            let actions = Pair::new(
                decode(a, &board.a, count_a),
                decode(b, &board.b, count_b),
            );
            advance_state(board, actions, turn);

            let reward = self.playout(board, turn + 1);
            self.policy
                .update(&mut self.arena[replies.at(a as usize)], reward, 1. / count_a as f32);
            return reward;
        }

        let (a, prob_a) = self.select(replies, count_a);
        let reply = replies.at(a as usize);
        let nexts = self.children(reply, &board.b);
        let count_b = self.arena[reply].choices;
        let (b, prob_b) = self.select(nexts, count_b);

        let actions = Pair::new(
            decode(a, &board.a, count_a),
            decode(b, &board.b, count_b),
        );
        advance_state(board, actions, turn);

        let next = nexts.at(b as usize);
        let reward = self.visit(next, board, turn + 1);

        self.policy.update(&mut self.arena[reply], reward, prob_a);
        self.policy.update(&mut self.arena[next], -reward, prob_b);
        reward
    }

    fn playout(&mut self, board: &mut Board, mut turn: u32) -> f32 {
        loop {
            let outcome = status(board, turn, self.max_turn);
            if outcome.is_terminal() {
                return outcome.reward();
            }

            let menus = Pair::new(Menu::new(&board.a), Menu::new(&board.b));
            let actions = menus.map(|m| m.decode(self.rng.gen_range(0..m.len())));
            advance_state(board, actions, turn);
            turn += 1;
        }
    }
}
