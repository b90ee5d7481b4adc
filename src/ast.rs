//! Generic walk over executable GraphQL documents
//!
//! A [`Visitor`] receives `enter`/`leave` callbacks for every node the walk
//! reaches and may stop the whole walk by returning [`ControlFlow::Break`].
//! Any parser that produces an [`ExecutableDocument`] can drive it.

use async_graphql::parser::types::{
    Directive, ExecutableDocument, Field, FragmentDefinition, FragmentSpread, InlineFragment,
    OperationDefinition, Selection, SelectionSet,
};
use async_graphql::{Name, Positioned};
use std::ops::ControlFlow;

/// A node reached by the walk
#[derive(Debug, Clone, Copy)]
pub enum AstNode<'a> {
    Operation(Option<&'a Name>, &'a Positioned<OperationDefinition>),
    FragmentDefinition(&'a Name, &'a Positioned<FragmentDefinition>),
    Field(&'a Positioned<Field>),
    FragmentSpread(&'a Positioned<FragmentSpread>),
    InlineFragment(&'a Positioned<InlineFragment>),
    Directive(&'a Positioned<Directive>),
}

/// Enter/leave callbacks
///
/// Both default to continuing the walk. `leave` is not called for a node
/// whose subtree was cut short by a `Break`.
pub trait Visitor<'a> {
    fn enter(&mut self, _node: AstNode<'a>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave(&mut self, _node: AstNode<'a>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Walk every operation and every fragment definition, in that order
///
/// Fragment spreads are reported but not followed, so each node of the source
/// text is visited exactly once. Fragment definitions are visited in name
/// order.
pub fn walk_document<'a, V: Visitor<'a>>(doc: &'a ExecutableDocument, visitor: &mut V) -> ControlFlow<()> {
    let mut walker = Walker {
        doc,
        visitor,
        expand_spreads: false,
        spread_stack: Vec::new(),
    };

    for (name, operation) in doc.operations.iter() {
        walker.operation(name, operation)?;
    }

    let mut fragments: Vec<_> = doc.fragments.iter().collect();
    fragments.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
    for (name, fragment) in fragments {
        walker.fragment_definition(name, fragment)?;
    }

    ControlFlow::Continue(())
}

/// Walk the operation that would be executed
///
/// With `operation_name` set, the operation of that name; otherwise the
/// document's only operation. Named fragment spreads are expanded in place,
/// which gives the same field nesting the response will have. A spread that
/// is already being expanded higher up is skipped.
pub fn walk_operation<'a, V: Visitor<'a>>(
    doc: &'a ExecutableDocument,
    operation_name: Option<&str>,
    visitor: &mut V,
) -> ControlFlow<()> {
    let Some((name, operation)) = select_operation(doc, operation_name) else {
        return ControlFlow::Continue(());
    };

    let mut walker = Walker {
        doc,
        visitor,
        expand_spreads: true,
        spread_stack: Vec::new(),
    };
    walker.operation(name, operation)
}

/// The operation `operation_name` refers to
pub fn select_operation<'a>(
    doc: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Option<(Option<&'a Name>, &'a Positioned<OperationDefinition>)> {
    let mut operations = doc.operations.iter();
    match operation_name {
        Some(wanted) => operations.find(|(name, _)| name.is_some_and(|name| name.as_str() == wanted)),
        None => {
            let only = operations.next()?;
            operations.next().is_none().then_some(only)
        }
    }
}

struct Walker<'a, 'v, V> {
    doc: &'a ExecutableDocument,
    visitor: &'v mut V,
    expand_spreads: bool,
    spread_stack: Vec<&'a str>,
}

impl<'a, V: Visitor<'a>> Walker<'a, '_, V> {
    fn operation(
        &mut self,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) -> ControlFlow<()> {
        let node = AstNode::Operation(name, operation);
        self.visitor.enter(node)?;
        self.directives(&operation.node.directives)?;
        self.selection_set(&operation.node.selection_set)?;
        self.visitor.leave(node)
    }

    fn fragment_definition(
        &mut self,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) -> ControlFlow<()> {
        let node = AstNode::FragmentDefinition(name, fragment);
        self.visitor.enter(node)?;
        self.directives(&fragment.node.directives)?;
        self.selection_set(&fragment.node.selection_set)?;
        self.visitor.leave(node)
    }

    fn selection_set(&mut self, selection_set: &'a Positioned<SelectionSet>) -> ControlFlow<()> {
        for selection in &selection_set.node.items {
            match &selection.node {
                Selection::Field(field) => self.field(field)?,
                Selection::FragmentSpread(spread) => self.fragment_spread(spread)?,
                Selection::InlineFragment(inline) => self.inline_fragment(inline)?,
            }
        }
        ControlFlow::Continue(())
    }

    fn field(&mut self, field: &'a Positioned<Field>) -> ControlFlow<()> {
        let node = AstNode::Field(field);
        self.visitor.enter(node)?;
        self.directives(&field.node.directives)?;
        self.selection_set(&field.node.selection_set)?;
        self.visitor.leave(node)
    }

    fn fragment_spread(&mut self, spread: &'a Positioned<FragmentSpread>) -> ControlFlow<()> {
        let node = AstNode::FragmentSpread(spread);
        self.visitor.enter(node)?;
        self.directives(&spread.node.directives)?;

        if self.expand_spreads {
            let name = spread.node.fragment_name.node.as_str();
            if !self.spread_stack.contains(&name) {
                if let Some(fragment) = self.doc.fragments.get(&spread.node.fragment_name.node) {
                    self.spread_stack.push(name);
                    self.selection_set(&fragment.node.selection_set)?;
                    self.spread_stack.pop();
                }
            }
        }

        self.visitor.leave(node)
    }

    fn inline_fragment(&mut self, inline: &'a Positioned<InlineFragment>) -> ControlFlow<()> {
        let node = AstNode::InlineFragment(inline);
        self.visitor.enter(node)?;
        self.directives(&inline.node.directives)?;
        self.selection_set(&inline.node.selection_set)?;
        self.visitor.leave(node)
    }

    fn directives(&mut self, directives: &'a [Positioned<Directive>]) -> ControlFlow<()> {
        for directive in directives {
            let node = AstNode::Directive(directive);
            self.visitor.enter(node)?;
            self.visitor.leave(node)?;
        }
        ControlFlow::Continue(())
    }
}
